use std::collections::BTreeMap;
use std::path::Path;

use log::debug;

use super::{check_index, check_length, Dataset};
use crate::data::loader::load_table;
use crate::data::model::{Example, FeatureTable, MetadataValue, Targets, Tensor};
use crate::error::Result;
use crate::transform::{load_transformer, FittedTransformer, Identity};

/// Feature rows (and optional target rows) passed through fitted
/// transformers one at a time.
#[derive(Debug)]
pub struct TabularFeatureDataset {
    features: FeatureTable,
    targets: Option<FeatureTable>,
    x_transformer: Box<dyn FittedTransformer>,
    y_transformer: Box<dyn FittedTransformer>,
}

impl TabularFeatureDataset {
    /// Load the tables and transformers from disk. Without a target
    /// transformer, targets pass through unchanged.
    pub fn open(
        features_file: &Path,
        targets_file: Option<&Path>,
        x_transformer: &Path,
        y_transformer: Option<&Path>,
    ) -> Result<Self> {
        let features = load_table(features_file)?;
        let targets = targets_file.map(load_table).transpose()?;
        let x_transformer = load_transformer(x_transformer)?;
        let y_transformer = match y_transformer {
            Some(path) => load_transformer(path)?,
            None => Box::new(Identity),
        };
        Self::new(features, targets, x_transformer, y_transformer)
    }

    /// Fails when `targets` and `features` differ in row count.
    pub fn new(
        features: FeatureTable,
        targets: Option<FeatureTable>,
        x_transformer: Box<dyn FittedTransformer>,
        y_transformer: Box<dyn FittedTransformer>,
    ) -> Result<Self> {
        if let Some(t) = &targets {
            check_length("targets", features.len(), t.len())?;
        }
        Ok(TabularFeatureDataset {
            features,
            targets,
            x_transformer,
            y_transformer,
        })
    }
}

impl Dataset for TabularFeatureDataset {
    type Item = Example;

    fn len(&self) -> usize {
        self.features.len()
    }

    fn get_example(&self, idx: usize) -> Result<Example> {
        check_index(idx, self.len())?;
        debug!("Building tabular example {idx}");

        let row = self.features.values.row(idx);
        let x = self.x_transformer.transform_feature_vector(row)?;

        let targets = match &self.targets {
            Some(t) => {
                let y = self.y_transformer.transform_feature_vector(t.values.row(idx))?;
                Targets::Tensor(Tensor::F64(y.into_dyn()))
            }
            None => Targets::Empty,
        };

        let mut inputs = BTreeMap::new();
        inputs.insert("features".to_string(), Tensor::F64(x.into_dyn()));

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "example_row_number".to_string(),
            MetadataValue::Integer(idx as i64),
        );

        Ok(Example {
            inputs,
            targets,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoaderError;
    use crate::transform::StandardScaler;
    use ndarray::array;

    fn table(values: ndarray::Array2<f64>) -> FeatureTable {
        let names = (0..values.ncols()).map(|i| format!("c{i}")).collect();
        FeatureTable::new(names, values)
    }

    #[test]
    fn row_mismatch_fails_at_construction() {
        let err = TabularFeatureDataset::new(
            table(array![[1.0], [2.0]]),
            Some(table(array![[1.0]])),
            Box::new(Identity),
            Box::new(Identity),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LoaderError::LengthMismatch { expected: 2, actual: 1, .. }
        ));
    }

    #[test]
    fn transforms_features_and_targets() {
        let scaler = StandardScaler {
            mean: Some(vec![1.0, 1.0]),
            scale: Some(vec![1.0, 2.0]),
        };
        let ds = TabularFeatureDataset::new(
            table(array![[1.0, 1.0], [3.0, 5.0]]),
            Some(table(array![[0.0], [1.0]])),
            Box::new(scaler),
            Box::new(Identity),
        )
        .unwrap();

        let ex = ds.get_example(1).unwrap();
        let x = ex.inputs["features"].as_f64().unwrap();
        assert_eq!(x.as_slice().unwrap(), &[2.0, 2.0]);
        assert_eq!(
            ex.targets.tensor().and_then(Tensor::as_f64).unwrap().as_slice().unwrap(),
            &[1.0]
        );
        assert_eq!(ex.metadata["example_row_number"], MetadataValue::Integer(1));
    }

    #[test]
    fn no_targets_gives_empty_targets() {
        let ds = TabularFeatureDataset::new(
            table(array![[1.0]]),
            None,
            Box::new(Identity),
            Box::new(Identity),
        )
        .unwrap();
        assert!(ds.get_example(0).unwrap().targets.is_empty());
        assert!(ds.get_example(1).is_err());
    }
}
