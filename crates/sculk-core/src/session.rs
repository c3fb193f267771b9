use crate::CoreError;
use sculk_store::{DependencyGraph, InMemoryPack};
use std::path::Path;

/// A loaded pack together with its dependency graph.
///
/// Mutating commands open a session, edit both halves in memory and commit
/// once at the end.
#[derive(Debug)]
pub struct PackSession {
    pub pack: InMemoryPack,
    pub graph: DependencyGraph,
}

impl PackSession {
    pub fn open(root: &Path) -> Result<Self, CoreError> {
        let pack = InMemoryPack::load(root)?;
        let graph = DependencyGraph::load(pack.layout())?;
        Ok(Self { pack, graph })
    }

    pub fn commit(&mut self) -> Result<(), CoreError> {
        self.graph.save(self.pack.layout())?;
        self.pack.save()?;
        Ok(())
    }
}
