use core::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;

/// Keeps loaded values for the life of the process. Nothing is ever evicted or invalidated, and
/// a load that fails is simply tried again next time.
pub(crate) struct KeyedCache<Key: Hash + Eq, Value> {
    entries: IndexMap<Key,Rc<Value>>
}

impl<Key: Hash + Eq, Value> KeyedCache<Key,Value> {

    pub(crate) fn new() -> Self {
        Self {
            entries: IndexMap::new()
        }
    }

    pub(crate) fn get_or_load<Error, Loader: FnOnce(&Key) -> Result<Value,Error>>(&mut self, key: Key, loader: Loader) -> Result<Rc<Value>,Error> {
        if let Some(value) = self.entries.get(&key) {
            return Ok(Rc::clone(value))
        }
        let value = Rc::new(loader(&key)?);
        _ = self.entries.insert(key, Rc::clone(&value));
        Ok(value)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod test {
    use core::cell::Cell;
    use std::path::PathBuf;
    use std::rc::Rc;

    use super::KeyedCache;

    type Key = (PathBuf,String);

    fn key(layer: &str) -> Key {
        (PathBuf::from("data/Environmental_Designations.gpkg"),layer.to_owned())
    }

    #[test]
    fn test_loads_once() {
        let calls = Cell::new(0);
        let mut cache: KeyedCache<Key,String> = KeyedCache::new();
        let loader = |key: &Key| -> Result<String,String> {
            calls.set(calls.get() + 1);
            Ok(key.1.to_uppercase())
        };
        let first = cache.get_or_load(key("sssi"), loader).unwrap();
        let second = cache.get_or_load(key("sssi"), loader).unwrap();
        assert_eq!(calls.get(),1);
        assert!(Rc::ptr_eq(&first,&second));
        assert_eq!(*first,"SSSI");

        _ = cache.get_or_load(key("spa"), loader).unwrap();
        assert_eq!(calls.get(),2);
        assert_eq!(cache.len(),2);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let mut cache: KeyedCache<Key,String> = KeyedCache::new();
        let failed = cache.get_or_load(key("ramsar"), |_| Err::<String,_>("file locked"));
        assert_eq!(failed.unwrap_err(),"file locked");
        assert_eq!(cache.len(),0);
        let loaded = cache.get_or_load(key("ramsar"), |_| Ok::<_,&str>("ramsar".to_owned())).unwrap();
        assert_eq!(*loaded,"ramsar");
        assert_eq!(cache.len(),1);
    }
}
