//! The naming server's in-memory directory tree.
//!
//! Pure bookkeeping: every method here works on the maps alone and performs
//! no network or disk I/O, so the merge and lookup rules can be exercised
//! directly in tests. The server wiring in [`super::server`] holds a
//! [`Namespace`] behind one lock and layers the delegated storage calls on
//! top.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::NamingError;
use crate::path::DfsPath;
use crate::proto::{CommandStub, StorageStub};

/// One registered storage server, identified by its stub pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub storage: StorageStub,
    pub command: CommandStub,
}

/// What the namespace knows about one path.
#[derive(Debug, Clone)]
pub enum Node {
    Directory,
    /// A file and the endpoint owning its content.
    File(Endpoint),
}

impl Node {
    pub fn is_directory(&self) -> bool {
        matches!(self, Node::Directory)
    }
}

/// The directory tree: every known path with its directory flag and, for
/// files, the owning endpoint, plus the endpoints themselves in join order.
///
/// Invariants maintained here: the root is always present as a directory,
/// and every non-root known path has a known parent (creation checks it,
/// registration adoption fills in missing ancestors).
#[derive(Debug)]
pub struct Namespace {
    nodes: BTreeMap<DfsPath, Node>,
    endpoints: Vec<Endpoint>,
}

impl Namespace {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(DfsPath::root(), Node::Directory);
        Self {
            nodes,
            endpoints: Vec::new(),
        }
    }

    pub fn contains(&self, path: &DfsPath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn node(&self, path: &DfsPath) -> Option<&Node> {
        self.nodes.get(path)
    }

    /// Whether the path names a directory; `NotFound` if it is unknown.
    ///
    /// The node map is the sole source of truth here: no inference from the
    /// existence of descendants.
    pub fn is_directory(&self, path: &DfsPath) -> Result<bool, NamingError> {
        self.nodes
            .get(path)
            .map(Node::is_directory)
            .ok_or(NamingError::NotFound)
    }

    /// De-duplicated names of a directory's immediate children, sorted.
    pub fn children(&self, directory: &DfsPath) -> Result<Vec<String>, NamingError> {
        if !self.is_directory(directory)? {
            return Err(NamingError::NotFound);
        }
        let depth = directory.depth();
        let mut names = BTreeSet::new();
        for path in self.nodes.keys() {
            if path.depth() > depth && path.starts_with(directory) {
                if let Some(name) = path.component(depth) {
                    names.insert(name.to_string());
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    pub fn insert_file(&mut self, path: DfsPath, endpoint: Endpoint) {
        self.nodes.insert(path, Node::File(endpoint));
    }

    pub fn insert_directory(&mut self, path: DfsPath) {
        self.nodes.insert(path, Node::Directory);
    }

    /// Removes a single node. The root is never removed.
    pub fn remove(&mut self, path: &DfsPath) {
        if !path.is_root() {
            self.nodes.remove(path);
        }
    }

    /// Removes a path and everything beneath it. The root itself survives.
    pub fn remove_subtree(&mut self, path: &DfsPath) {
        if path.is_root() {
            return;
        }
        self.nodes.retain(|known, _| !known.starts_with(path));
    }

    /// The endpoint owning a file, if the path is a known file.
    pub fn endpoint(&self, path: &DfsPath) -> Option<&Endpoint> {
        match self.nodes.get(path) {
            Some(Node::File(endpoint)) => Some(endpoint),
            _ => None,
        }
    }

    /// The first endpoint that ever registered, used to place new files.
    pub fn first_endpoint(&self) -> Option<Endpoint> {
        self.endpoints.first().cloned()
    }

    /// Distinct command stubs owning files strictly beneath `directory`.
    pub fn commands_under(&self, directory: &DfsPath) -> Vec<CommandStub> {
        let mut commands: Vec<CommandStub> = Vec::new();
        for (path, node) in &self.nodes {
            if let Node::File(endpoint) = node {
                if path.depth() > directory.depth()
                    && path.starts_with(directory)
                    && !commands.contains(&endpoint.command)
                {
                    commands.push(endpoint.command.clone());
                }
            }
        }
        commands
    }

    /// Records a joining endpoint. Fails if either stub is already
    /// registered: one physical server may join at most once.
    pub fn register_endpoint(&mut self, endpoint: &Endpoint) -> Result<(), NamingError> {
        let duplicate = self
            .endpoints
            .iter()
            .any(|known| known.storage == endpoint.storage || known.command == endpoint.command);
        if duplicate {
            return Err(NamingError::DuplicateRegistration);
        }
        self.endpoints.push(endpoint.clone());
        Ok(())
    }

    /// Merges an advertised file inventory into the namespace.
    ///
    /// Paths that collide with existing content are returned in advertised
    /// order for the joiner to delete locally; everything else is adopted
    /// as a file owned by `endpoint`, with missing ancestors created as
    /// directories. Previously known files are never touched.
    pub fn adopt(&mut self, paths: &[DfsPath], endpoint: &Endpoint) -> Vec<DfsPath> {
        let mut collisions = Vec::new();
        for path in paths {
            if path.is_root() {
                continue;
            }
            if self.collides(path) {
                collisions.push(path.clone());
                continue;
            }
            for depth in 1..path.depth() {
                let ancestor = path.prefix(depth);
                if !self.contains(&ancestor) {
                    self.insert_directory(ancestor);
                }
            }
            self.insert_file(path.clone(), endpoint.clone());
        }
        collisions
    }

    /// An advertised path collides when it is already known, when known
    /// content lies strictly beneath it, or when one of its strict
    /// ancestors is a file.
    fn collides(&self, path: &DfsPath) -> bool {
        if self.nodes.contains_key(path) {
            return true;
        }
        if self
            .nodes
            .keys()
            .any(|known| known.depth() > path.depth() && known.starts_with(path))
        {
            return true;
        }
        for depth in 1..path.depth() {
            if let Some(Node::File(_)) = self.nodes.get(&path.prefix(depth)) {
                return true;
            }
        }
        false
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}
