//! Registries of data managers and states updaters
//!
//! Keys are matched case-insensitively, and a qualified name such as
//! `ch.usi.gassert.data.manager.method.MethodRegularDataManager` resolves to
//! its last segment.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rand::RngCore;

use crate::data::manager::{DataManager, DataManagerArgs, MetamorphicDataManager, RegularDataManager};
use crate::error::DataError;
use crate::state::updater::{DirectoryStatesUpdater, NullStatesUpdater, StatesUpdater};

type ManagerConstructor =
    Box<dyn Fn(DataManagerArgs, &mut dyn RngCore) -> Result<Box<dyn DataManager>, DataError> + Send + Sync>;

type UpdaterConstructor = Box<dyn Fn(&str) -> Result<Box<dyn StatesUpdater>, DataError> + Send + Sync>;

fn normalize_key(name: &str) -> String {
    let name = name.trim();
    name.rsplit('.').next().unwrap_or(name).to_ascii_lowercase()
}

pub struct DataManagerRegistry {
    constructors: BTreeMap<String, ManagerConstructor>,
}

impl Default for DataManagerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(&["regular", "MethodRegularDataManager"], |args, rng| {
            Ok(Box::new(RegularDataManager::new(args, rng)?))
        });
        registry.register(&["metamorphic", "MethodMetamorphicDataManager"], |args, rng| {
            Ok(Box::new(MetamorphicDataManager::new(args, rng)?))
        });
        registry
    }
}

impl DataManagerRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Register a constructor under every key of `keys`
    pub fn register<F>(&mut self, keys: &[&str], constructor: F)
    where
        F: Fn(DataManagerArgs, &mut dyn RngCore) -> Result<Box<dyn DataManager>, DataError>
            + Clone
            + Send
            + Sync
            + 'static,
    {
        for key in keys {
            self.constructors
                .insert(normalize_key(key), Box::new(constructor.clone()));
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn create(
        &self,
        name: &str,
        args: DataManagerArgs,
        rng: &mut dyn RngCore,
    ) -> Result<Box<dyn DataManager>, DataError> {
        let constructor = self
            .constructors
            .get(&normalize_key(name))
            .ok_or_else(|| DataError::UnknownManager(name.to_string()))?;
        constructor(args, rng)
    }
}

pub struct StatesUpdaterRegistry {
    constructors: BTreeMap<String, UpdaterConstructor>,
}

impl Default for StatesUpdaterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(&["null", "NullStatesUpdater"], |_| Ok(Box::new(NullStatesUpdater)));
        registry.register(&["directory", "DirectoryStatesUpdater"], |args| {
            let dir = args.split(';').next().map(str::trim).unwrap_or_default();
            if dir.is_empty() {
                return Err(DataError::InvalidArgs(
                    "the directory updater needs a directory".to_string(),
                ));
            }
            Ok(Box::new(DirectoryStatesUpdater::new(PathBuf::from(dir))?))
        });
        registry
    }
}

impl StatesUpdaterRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    pub fn register<F>(&mut self, keys: &[&str], constructor: F)
    where
        F: Fn(&str) -> Result<Box<dyn StatesUpdater>, DataError> + Clone + Send + Sync + 'static,
    {
        for key in keys {
            self.constructors
                .insert(normalize_key(key), Box::new(constructor.clone()));
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn create(&self, name: &str, args: &str) -> Result<Box<dyn StatesUpdater>, DataError> {
        let constructor = self
            .constructors
            .get(&normalize_key(name))
            .ok_or_else(|| DataError::UnknownUpdater(name.to_string()))?;
        constructor(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::manager::tests::write_corpus;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Regular"), "regular");
        assert_eq!(
            normalize_key("ch.usi.gassert.data.manager.method.MethodRegularDataManager"),
            "methodregulardatamanager"
        );
    }

    #[test]
    fn test_manager_registry() {
        let registry = DataManagerRegistry::default();
        let keys: Vec<&str> = registry.keys().collect();
        assert!(keys.contains(&"regular"));
        assert!(keys.contains(&"methodmetamorphicdatamanager"));

        let dir = tempfile::tempdir().unwrap();
        let args = write_corpus(dir.path());
        let mut rng = StdRng::seed_from_u64(3);
        let manager = registry
            .create("ch.usi.gassert.data.manager.method.MethodRegularDataManager", args.clone(), &mut rng)
            .unwrap();
        assert_eq!(manager.corpus().incorrect.len(), 1);
        assert!(matches!(
            registry.create("quantum", args, &mut rng),
            Err(DataError::UnknownManager(_))
        ));
    }

    #[test]
    fn test_updater_registry() {
        let registry = StatesUpdaterRegistry::default();
        assert!(registry.create("NullStatesUpdater", "").is_ok());
        assert!(matches!(
            registry.create("directory", ""),
            Err(DataError::InvalidArgs(_))
        ));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exchange");
        assert!(registry.create("Directory", &path.display().to_string()).is_ok());
        assert!(path.is_dir());
        assert!(matches!(registry.create("oracle", ""), Err(DataError::UnknownUpdater(_))));
    }
}
