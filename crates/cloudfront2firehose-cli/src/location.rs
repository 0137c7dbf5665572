// Replay locations
//
// `s3://bucket/key` reads from S3; anything else is a path under --dir.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    S3 { bucket: String, key: String },
    Local { path: String },
}

impl Location {
    pub fn key(&self) -> &str {
        match self {
            Location::S3 { key, .. } => key,
            Location::Local { path } => path,
        }
    }
}

impl FromStr for Location {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(rest) = s.strip_prefix("s3://") {
            let Some((bucket, key)) = rest.split_once('/') else {
                bail!("S3 location '{}' has no object key (expected s3://bucket/key)", s);
            };
            if bucket.is_empty() || key.is_empty() {
                bail!("S3 location '{}' must name both a bucket and a key", s);
            }
            return Ok(Location::S3 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        let path = s.trim_start_matches("./");
        if path.is_empty() {
            bail!("empty location");
        }
        if path.split('/').any(|segment| segment == "..") {
            bail!("local location '{}' must stay inside --dir", s);
        }
        Ok(Location::Local {
            path: path.to_string(),
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::S3 { bucket, key } => write!(f, "s3://{}/{}", bucket, key),
            Location::Local { path } => f.write_str(path),
        }
    }
}
