//! Named collections of plugin descriptors.

use std::fmt;

use super::descriptor::PluginDescriptor;

/// One plugin search location.
///
/// A host keeps an ordered list of catalogs; the first catalog containing a
/// plugin name wins.
pub struct PluginCatalog<H> {
    location: String,
    plugins: Vec<PluginDescriptor<H>>,
}

impl<H> PluginCatalog<H> {
    /// Creates an empty catalog.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            plugins: Vec::new(),
        }
    }

    /// Adds a descriptor (builder pattern).
    pub fn with(mut self, descriptor: PluginDescriptor<H>) -> Self {
        self.add(descriptor);
        self
    }

    /// Adds a descriptor. A later descriptor with the same name is shadowed by
    /// the earlier one.
    pub fn add(&mut self, descriptor: PluginDescriptor<H>) {
        self.plugins.push(descriptor);
    }

    /// Returns the location name.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Looks up a descriptor by plugin name.
    pub fn find(&self, name: &str) -> Option<PluginDescriptor<H>> {
        self.plugins.iter().find(|d| d.name == name).copied()
    }

    /// Returns the names of all plugins in this catalog, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.iter().map(|d| d.name)
    }

    /// Returns the number of descriptors.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if the catalog has no descriptors.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl<H> fmt::Debug for PluginCatalog<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("location", &self.location)
            .field("plugins", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
