use crate::Identifier;
use core::ops::Deref;
use heapless::Vec;

/// Identifiers found on a bus, in discovery order, at most `N` of them
#[derive(Debug, Clone, Default)]
pub struct Registry<const N: usize> {
    ids: Vec<Identifier, N>,
}

impl<const N: usize> Registry<N> {
    pub const CAPACITY: usize = N;

    pub fn new() -> Self {
        Registry { ids: Vec::new() }
    }

    /// Appends `id` unless it is already known.
    ///
    /// Returns `Ok(true)` if it was added, `Ok(false)` for a duplicate and
    /// `Err(id)` if the registry is full.
    pub fn insert(&mut self, id: Identifier) -> Result<bool, Identifier> {
        if self.ids.contains(&id) {
            return Ok(false);
        }
        self.ids.push(id)?;
        Ok(true)
    }

    pub fn is_full(&self) -> bool {
        self.ids.is_full()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Identifiers of one device family, e.g. `0x28` for DS18B20
    pub fn family(&self, family_code: u8) -> impl Iterator<Item = &Identifier> {
        self.ids
            .iter()
            .filter(move |id| id.family_code() == family_code)
    }
}

impl<const N: usize> Deref for Registry<N> {
    type Target = [Identifier];

    fn deref(&self) -> &Self::Target {
        &self.ids
    }
}

impl<'a, const N: usize> IntoIterator for &'a Registry<N> {
    type Item = &'a Identifier;
    type IntoIter = core::slice::Iter<'a, Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}
