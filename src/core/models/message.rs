use std::collections::BTreeSet;

/// Outcome of probing a text blob for an OpenPGP envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// `-----BEGIN PGP SIGNED MESSAGE-----` with a parseable signature block.
    Cleartext,
    /// `-----BEGIN PGP MESSAGE-----` that parses as an OpenPGP message.
    Encrypted,
    Unrecognized,
}

impl MessageKind {
    pub fn is_pgp(self) -> bool {
        !matches!(self, MessageKind::Unrecognized)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Cleartext => write!(f, "cleartext-signed message"),
            MessageKind::Encrypted => write!(f, "encrypted message"),
            MessageKind::Unrecognized => write!(f, "not an OpenPGP message"),
        }
    }
}

/// A key ID a message claims to be encrypted to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecipientId {
    /// An ordinary 16-hex key ID.
    Known(String),
    /// A wildcard recipient. Only its packet position is known.
    Hidden(usize),
}

impl RecipientId {
    pub fn is_hidden(&self) -> bool {
        matches!(self, RecipientId::Hidden(_))
    }
}

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecipientId::Known(id) => write!(f, "{id}"),
            RecipientId::Hidden(pos) => write!(f, "hidden#{pos}"),
        }
    }
}

/// Metadata one secret key can see in an encrypted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageDetail {
    pub is_signed: bool,
    /// Only meaningful when `is_signed`.
    pub signed_by_key_id: Option<String>,
    /// In packet order.
    pub encrypted_to: Vec<RecipientId>,
}

impl MessageDetail {
    /// Split the declared recipients into ordinary and hidden sets.
    pub fn partition(&self) -> (BTreeSet<String>, BTreeSet<RecipientId>) {
        let mut known = BTreeSet::new();
        let mut hidden = BTreeSet::new();
        for id in &self.encrypted_to {
            if id.is_hidden() {
                hidden.insert(id.clone());
            } else if let RecipientId::Known(k) = id {
                known.insert(k.clone());
            }
        }
        (known, hidden)
    }
}

/// Plaintext recovered by the backend, with the signature issuers it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    pub plaintext: Vec<u8>,
    pub signer_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_separates_hidden_ids() {
        let detail = MessageDetail {
            is_signed: false,
            signed_by_key_id: None,
            encrypted_to: vec![
                RecipientId::Known("AAAA".into()),
                RecipientId::Hidden(1),
                RecipientId::Known("BBBB".into()),
                RecipientId::Known("AAAA".into()),
            ],
        };

        let (known, hidden) = detail.partition();
        assert_eq!(known.len(), 2);
        assert!(known.contains("AAAA") && known.contains("BBBB"));
        assert_eq!(hidden.len(), 1);
        assert!(hidden.iter().all(|h| h.is_hidden()));
    }

    #[test]
    fn unrecognized_is_not_pgp() {
        assert!(MessageKind::Cleartext.is_pgp());
        assert!(MessageKind::Encrypted.is_pgp());
        assert!(!MessageKind::Unrecognized.is_pgp());
    }
}
