use std::fmt;

use crate::error::StorageError;

/// Width, in bytes, of every hash the engine stores. RFC 6962 SHA-256 is
/// assumed by contract (see spec §1); other hash strategies are out of
/// scope, so this is a `const` rather than a per-tree parameter.
pub const HASH_LEN: usize = 32;

macro_rules! fixed_hash {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub [u8; HASH_LEN]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; HASH_LEN]> for $name {
            fn from(bytes: [u8; HASH_LEN]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = StorageError;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                if value.len() != HASH_LEN {
                    return Err(StorageError::invalid_argument(format!(
                        "{} must be {} bytes, got {}",
                        stringify!($name),
                        HASH_LEN,
                        value.len()
                    )));
                }
                let mut bytes = [0u8; HASH_LEN];
                bytes.copy_from_slice(value);
                Ok(Self(bytes))
            }
        }

        impl TryFrom<Vec<u8>> for $name {
            type Error = StorageError;

            fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
                Self::try_from(value.as_slice())
            }
        }
    };
}

fixed_hash!(
    LeafIdentityHash,
    "The dedup key for a leaf, unique per tree."
);
fixed_hash!(
    MerkleLeafHash,
    "The value inserted into the Merkle tree; need not be unique."
);
fixed_hash!(RootHash, "The RFC 6962 root over a tree's sequenced leaves.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        let short = vec![0u8; 16];
        let err = LeafIdentityHash::try_from(short).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn round_trips_through_bytes() {
        let bytes = [7u8; HASH_LEN];
        let hash = MerkleLeafHash::from(bytes);
        assert_eq!(hash.as_bytes(), &bytes[..]);
        let back = MerkleLeafHash::try_from(hash.as_bytes()).unwrap();
        assert_eq!(hash, back);
    }
}
