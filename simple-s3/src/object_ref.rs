use std::{fmt::Display, str::FromStr};

/// An object location as typed by a human: either `s3://<bucket>/<key>`, or just
/// `<key>` when the bucket should come from the configured default.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct ObjectRef {
    pub bucket: Option<String>,
    pub key: String,
}

impl ObjectRef {
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseObjectRefError {
    #[error("expected s3://<bucket>/<key>")]
    MissingKeySeparator,
    #[error("bucket must not be empty")]
    EmptyBucket,
    #[error("key must not be empty")]
    EmptyKey,
}

impl FromStr for ObjectRef {
    type Err = ParseObjectRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(rest) = s.strip_prefix("s3://") else {
            if s.is_empty() {
                return Err(ParseObjectRefError::EmptyKey);
            }
            return Ok(Self {
                bucket: None,
                key: s.to_owned(),
            });
        };
        let (bucket, key) = rest
            .split_once('/')
            .ok_or(ParseObjectRefError::MissingKeySeparator)?;
        if bucket.is_empty() {
            return Err(ParseObjectRefError::EmptyBucket);
        }
        if key.is_empty() {
            return Err(ParseObjectRefError::EmptyKey);
        }

        Ok(Self {
            bucket: Some(bucket.to_owned()),
            key: key.to_owned(),
        })
    }
}

impl Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.bucket {
            Some(bucket) => write!(f, "s3://{bucket}/{}", self.key),
            None => f.write_str(&self.key),
        }
    }
}
