use crate::RemoteError;
use serde::{Deserialize, Serialize};
use tilekit_schema::{manifest_cid, Cid, Manifest, SchemaError};

/// A tile record as stored in a repository collection: the manifest itself,
/// the CID of its canonical encoding, and the publication timestamp. The CID
/// travels with the record so readers can check the manifest they received
/// is the manifest that was published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileRecord {
    pub cid: Cid,
    pub tile: Manifest,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl TileRecord {
    pub fn new(tile: Manifest) -> Result<Self, SchemaError> {
        let cid = manifest_cid(&tile)?;
        Ok(Self {
            cid,
            tile,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Recompute the manifest CID and compare against the recorded one.
    pub fn verify(&self) -> Result<(), RemoteError> {
        let actual = manifest_cid(&self.tile)?;
        if actual != self.cid {
            return Err(RemoteError::IntegrityFailure {
                key: "tile record".to_owned(),
                expected: self.cid.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }
}
