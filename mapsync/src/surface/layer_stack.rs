use mapsync_types::{FilterExpression, LayerDescriptor, Visibility};

/// Ordered stack of layers on a surface.
///
/// When a surface is drawn, layers are painted from the first entry (bottom) to the last one
/// (top). Any layer can be temporarily hidden with [`LayerStack::set_visibility`]. Hidden layers
/// are skipped when drawing, but retain their place in the stack.
///
/// The filter and visibility of a layer live in the stack entry, not in the descriptor the layer
/// was added with, since they are changed in place after the layer is added.
///
/// ```
/// use mapsync::surface::LayerStack;
/// use mapsync_types::{LayerDescriptor, LayerKind, Visibility};
///
/// let mut stack = LayerStack::default();
/// stack.push(LayerDescriptor::new("Layer A", LayerKind::Fill, "s").unwrap());
/// stack.push(LayerDescriptor::new("Layer B", LayerKind::Line, "s").unwrap());
/// stack.set_visibility("Layer A", Visibility::None);
///
/// assert_eq!(stack.ids().collect::<Vec<_>>(), ["Layer A", "Layer B"]);
/// assert_eq!(stack.iter_visible().count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct LayerStack(Vec<LayerEntry>);

#[derive(Debug)]
struct LayerEntry {
    layer: LayerDescriptor,
    filter: Option<FilterExpression>,
    is_hidden: bool,
}

impl From<LayerDescriptor> for LayerEntry {
    fn from(layer: LayerDescriptor) -> Self {
        Self {
            filter: layer.filter().cloned(),
            is_hidden: !layer.visibility().is_visible(),
            layer,
        }
    }
}

impl LayerStack {
    /// Position of the layer counting from the bottom.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|entry| entry.layer.id() == id)
    }

    /// Returns true if the stack contains a layer with the id.
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Puts the layer on top of the stack.
    pub fn push(&mut self, layer: LayerDescriptor) {
        self.0.push(layer.into())
    }

    /// Inserts the layer at `index`, shifting all layers above it up.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, layer: LayerDescriptor) {
        self.0.insert(index, layer.into())
    }

    /// Removes the layer with the id and returns its descriptor.
    pub fn remove(&mut self, id: &str) -> Option<LayerDescriptor> {
        let index = self.position(id)?;
        Some(self.0.remove(index).layer)
    }

    /// Descriptor the layer was added with.
    pub fn get(&self, id: &str) -> Option<&LayerDescriptor> {
        self.entry(id).map(|entry| &entry.layer)
    }

    /// Current filter of the layer. Returns `None` if there is no such layer.
    pub fn filter(&self, id: &str) -> Option<Option<&FilterExpression>> {
        self.entry(id).map(|entry| entry.filter.as_ref())
    }

    /// Replaces the filter of the layer. Returns false if there is no such layer.
    pub fn set_filter(&mut self, id: &str, filter: Option<FilterExpression>) -> bool {
        match self.entry_mut(id) {
            Some(entry) => {
                entry.filter = filter;
                true
            }
            None => false,
        }
    }

    /// Current visibility of the layer. Returns `None` if there is no such layer.
    pub fn visibility(&self, id: &str) -> Option<Visibility> {
        self.entry(id).map(|entry| Visibility::from(!entry.is_hidden))
    }

    /// Shows or hides the layer. Returns false if there is no such layer.
    pub fn set_visibility(&mut self, id: &str, visibility: Visibility) -> bool {
        match self.entry_mut(id) {
            Some(entry) => {
                entry.is_hidden = !visibility.is_visible();
                true
            }
            None => false,
        }
    }

    /// First layer, counting from the bottom, that draws from the source.
    pub fn first_referencing(&self, source_id: &str) -> Option<&LayerDescriptor> {
        self.0
            .iter()
            .map(|entry| &entry.layer)
            .find(|layer| layer.source() == Some(source_id))
    }

    /// Ids of all layers from bottom to top.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(|entry| entry.layer.id())
    }

    /// Iterates over the layers that are drawn, from bottom to top.
    pub fn iter_visible(&self) -> impl Iterator<Item = &LayerDescriptor> + '_ {
        self.0
            .iter()
            .filter(|entry| !entry.is_hidden)
            .map(|entry| &entry.layer)
    }

    /// Returns the count of layers in the stack.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the stack contains no layers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Removes all layers.
    pub fn clear(&mut self) {
        self.0.clear()
    }

    fn entry(&self, id: &str) -> Option<&LayerEntry> {
        self.0.iter().find(|entry| entry.layer.id() == id)
    }

    fn entry_mut(&mut self, id: &str) -> Option<&mut LayerEntry> {
        self.0.iter_mut().find(|entry| entry.layer.id() == id)
    }
}
