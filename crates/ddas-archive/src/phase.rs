//! Archival state machine phases.

/// Where an archival request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchivalPhase {
    /// Streaming content through the digest engine.
    Hashing,
    /// Looking the fingerprint up in the ledger.
    Checking,
    /// Writing the artifact to object storage.
    Uploading,
    /// Registering the record in the ledger.
    Inserting,
    /// A new record was created. Terminal.
    Done,
    /// The content was already archived for this owner. Terminal.
    DuplicateFound,
}

impl ArchivalPhase {
    /// Lowercase label for logs, metrics, and API bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hashing => "hashing",
            Self::Checking => "checking",
            Self::Uploading => "uploading",
            Self::Inserting => "inserting",
            Self::Done => "done",
            Self::DuplicateFound => "duplicate_found",
        }
    }

    /// Whether the phase ends the request.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::DuplicateFound)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: ArchivalPhase) -> bool {
        use ArchivalPhase::*;
        matches!(
            (self, next),
            (Hashing, Checking)
                | (Checking, Uploading)
                | (Checking, DuplicateFound)
                | (Uploading, Inserting)
                | (Inserting, Done)
                | (Inserting, DuplicateFound)
        )
    }
}

impl std::fmt::Display for ArchivalPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ArchivalPhase::*;

    const ALL: [ArchivalPhase; 6] = [Hashing, Checking, Uploading, Inserting, Done, DuplicateFound];

    #[test]
    fn terminal_phases_have_no_successors() {
        for from in ALL.iter().filter(|p| p.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn happy_path_is_legal() {
        let path = [Hashing, Checking, Uploading, Inserting, Done];
        for w in path.windows(2) {
            assert!(w[0].can_transition_to(w[1]), "{} -> {}", w[0], w[1]);
        }
    }

    #[test]
    fn duplicates_short_circuit_from_checking_or_inserting() {
        assert!(Checking.can_transition_to(DuplicateFound));
        assert!(Inserting.can_transition_to(DuplicateFound));
        assert!(!Uploading.can_transition_to(DuplicateFound));
        assert!(!Hashing.can_transition_to(Uploading));
    }

    #[test]
    fn labels() {
        assert_eq!(DuplicateFound.to_string(), "duplicate_found");
        assert_eq!(Uploading.as_str(), "uploading");
    }
}
