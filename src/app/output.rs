use crate::adapters::export;
use crate::domain::model::{Cluster, HexCell, TerritoryEstimate};
use crate::domain::ports::Storage;
use crate::utils::error::Result;

/// Writes request results through a [`Storage`] in the configured formats.
pub struct ResultWriter<S: Storage> {
    storage: S,
    geojson: bool,
    csv: bool,
}

impl<S: Storage> ResultWriter<S> {
    pub fn new(storage: S, geojson: bool, csv: bool) -> Self {
        Self {
            storage,
            geojson,
            csv,
        }
    }

    /// Returns the written file names.
    pub async fn write_hexes(&self, stem: &str, hexes: &[HexCell]) -> Result<Vec<String>> {
        let mut written = Vec::new();
        if self.geojson {
            let collection = export::hexes_to_feature_collection(hexes);
            let name = format!("{}.geojson", stem);
            self.storage
                .write_file(&name, collection.to_string().as_bytes())
                .await?;
            written.push(name);
        }
        if self.csv {
            let name = format!("{}.csv", stem);
            self.storage
                .write_file(&name, &export::hexes_to_csv(hexes)?)
                .await?;
            written.push(name);
        }
        Ok(written)
    }

    pub async fn write_clusters(&self, stem: &str, clusters: &[Cluster]) -> Result<Vec<String>> {
        let mut written = Vec::new();
        if self.geojson {
            let collection = export::clusters_to_feature_collection(clusters);
            let name = format!("{}.geojson", stem);
            self.storage
                .write_file(&name, collection.to_string().as_bytes())
                .await?;
            written.push(name);
        }
        if self.csv {
            let name = format!("{}.csv", stem);
            self.storage
                .write_file(&name, &export::clusters_to_csv(clusters)?)
                .await?;
            written.push(name);
        }
        Ok(written)
    }

    /// The estimate is always written as JSON; CSV on request.
    pub async fn write_estimate(
        &self,
        stem: &str,
        estimate: &TerritoryEstimate,
    ) -> Result<Vec<String>> {
        let name = format!("{}.json", stem);
        self.storage
            .write_file(&name, &export::estimate_to_json(estimate)?)
            .await?;
        let mut written = vec![name];
        if self.csv {
            let name = format!("{}.csv", stem);
            self.storage
                .write_file(&name, &export::estimate_to_csv(estimate)?)
                .await?;
            written.push(name);
        }
        Ok(written)
    }
}
