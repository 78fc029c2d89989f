use data_encoding::HEXLOWER;
use thiserror::Error;

pub const MD5_LEN: usize = 16;

/// A 16-byte MD5 content digest, as recorded by the layer loader for each
/// regular file. Directories and entries with unknown content carry the
/// all-zero digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Md5Digest([u8; MD5_LEN]);

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid digest length: {0}")]
    InvalidDigestLen(usize),
}

impl Md5Digest {
    pub const ZERO: Md5Digest = Md5Digest([0; MD5_LEN]);

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; MD5_LEN]
    }
}

impl From<[u8; MD5_LEN]> for Md5Digest {
    fn from(value: [u8; MD5_LEN]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for Md5Digest {
    type Error = Error;

    // Returns an error if the digest has the wrong length.
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; MD5_LEN] = value
            .try_into()
            .map_err(|_| Error::InvalidDigestLen(value.len()))?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for Md5Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "md5:{}", HEXLOWER.encode(&self.0))
    }
}

impl std::fmt::Debug for Md5Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
