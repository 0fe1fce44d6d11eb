//! Core sparse merkle trie implementation

use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    db::Db,
    node::{common_prefix_len, flip_bit, ExtensionNode, InnerNode, LazyNode, LeafNode, Node, Sum},
    spec::{Hasher, TrieSpec},
    TreeError,
};

use super::MerkleRoot;

/// Digests of persisted nodes replaced by a single operation.
type Orphans = Vec<Vec<u8>>;

/// Sparse merkle trie over a digest-keyed node store.
/// * `N` - path and hash size in bytes.
/// * `H` - Hasher that will be used to hash keys, values and nodes.
/// * `DbError` - error type of the store.
///
/// Mutations only touch the in-memory copy-on-write tree. Nothing reaches the
/// store before [`SparseMerkleTrie::commit`].
pub struct SparseMerkleTrie<const N: usize, H: Hasher<N>, DbError> {
    db: Box<dyn Db<DbError = DbError>>,
    spec: TrieSpec<N, H>,
    root: Option<Arc<Node<N>>>,
    saved_root: Option<Vec<u8>>,
    orphans: Vec<Orphans>,
}

impl<const N: usize, H: Hasher<N>, DbError> SparseMerkleTrie<N, H, DbError> {
    /// Creates an empty trie on top of `db`.
    pub fn new(db: Box<dyn Db<DbError = DbError>>, spec: TrieSpec<N, H>) -> Self {
        Self {
            db,
            spec,
            root: None,
            saved_root: None,
            orphans: Vec::new(),
        }
    }

    /// Opens the trie committed under `root`. Nothing is read until a walk
    /// reaches the root.
    pub fn import(db: Box<dyn Db<DbError = DbError>>, spec: TrieSpec<N, H>, root: &[u8]) -> Self {
        let mut trie = Self::new(db, spec);
        if !spec.is_placeholder(root) {
            trie.root = Some(Arc::new(Node::Lazy(LazyNode::new(root.to_vec()))));
        }
        trie.saved_root = Some(root.to_vec());
        trie
    }

    pub fn db(&self) -> &dyn Db<DbError = DbError> {
        self.db.as_ref()
    }

    /// Gives the store back, dropping uncommitted changes.
    pub fn into_db(self) -> Box<dyn Db<DbError = DbError>> {
        self.db
    }

    pub fn spec(&self) -> &TrieSpec<N, H> {
        &self.spec
    }

    /// Current root digest, including uncommitted changes.
    pub fn root(&self) -> MerkleRoot<N> {
        MerkleRoot::new(self.root_digest())
    }

    /// Root as of the last commit or import.
    pub fn saved_root(&self) -> Option<MerkleRoot<N>> {
        self.saved_root.clone().map(MerkleRoot::new)
    }

    /// Number of stored records waiting to be removed by the next commit.
    pub fn pending_orphans(&self) -> usize {
        self.orphans.iter().map(Vec::len).sum()
    }

    fn root_digest(&self) -> Vec<u8> {
        match &self.root {
            Some(root) => root.digest(&self.spec).to_vec(),
            None => self.spec.placeholder(),
        }
    }

    /// Value digest stored under `key`, or an empty vector if the key is absent.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>, TreeError<DbError>> {
        Ok(self
            .get_leaf(&self.spec.path(key))?
            .map(|(value_hash, _)| value_hash)
            .unwrap_or_default())
    }

    pub(crate) fn get_leaf(&self, path: &[u8; N]) -> Result<Option<(Vec<u8>, Sum)>, TreeError<DbError>> {
        let mut depth = 0;
        let mut current = self.resolve_root()?;
        while let Some(node) = current {
            current = match node.as_ref() {
                Node::Leaf(leaf) if leaf.path() == path => {
                    return Ok(Some((leaf.value_hash().to_vec(), leaf.sum())))
                }
                Node::Leaf(_) => None,
                Node::Inner(inner) => {
                    let (next, _) = inner.step(depth, path);
                    depth += 1;
                    self.resolve_lazy(next)?
                }
                Node::Extension(extension) => {
                    if extension.diverging_bit(path).is_some() {
                        return Ok(None);
                    }
                    depth = extension.end();
                    self.resolve_lazy(extension.child())?
                }
                Node::Lazy(lazy) => self.load(lazy)?,
            };
        }
        Ok(None)
    }

    /// Sets `key` to `value`. An empty value removes the key.
    pub fn update(&mut self, key: &[u8], value: &[u8]) -> Result<(), TreeError<DbError>> {
        self.update_with_sum(key, value, 0)
    }

    pub(crate) fn update_with_sum(
        &mut self,
        key: &[u8],
        value: &[u8],
        sum: Sum,
    ) -> Result<(), TreeError<DbError>> {
        if value.is_empty() {
            return match self.delete(key) {
                Err(TreeError::KeyNotFound) => Ok(()),
                result => result,
            };
        }
        let path = self.spec.path(key);
        let leaf = Arc::new(Node::Leaf(LeafNode::new(
            path,
            self.spec.value_hash(value),
            sum,
        )));
        let mut orphans = Vec::new();
        let root = self.update_node(self.root.as_ref(), 0, &path, leaf, &mut orphans)?;
        trace!(path = %hex::encode(path), orphans = orphans.len(), "updated key");
        self.root = Some(root);
        self.orphans.push(orphans);
        Ok(())
    }

    fn update_node(
        &self,
        node: Option<&Arc<Node<N>>>,
        depth: usize,
        path: &[u8; N],
        leaf: Arc<Node<N>>,
        orphans: &mut Orphans,
    ) -> Result<Arc<Node<N>>, TreeError<DbError>> {
        let node = match node {
            Some(node) => self.resolve_lazy(node)?,
            None => None,
        };
        let Some(node) = node else {
            return Ok(leaf);
        };
        match node.as_ref() {
            Node::Leaf(existing) if existing.path() == path => {
                self.orphan(&node, orphans);
                Ok(leaf)
            }
            Node::Leaf(existing) => {
                // both leaves move down to the first bit where they differ
                let split = common_prefix_len(existing.path(), path, depth);
                let inner = Arc::new(Node::Inner(InnerNode::ordered(
                    split,
                    path,
                    leaf,
                    node.clone(),
                )));
                if split > depth {
                    Ok(Arc::new(Node::Extension(ExtensionNode::new(
                        *path, depth, split, inner,
                    ))))
                } else {
                    Ok(inner)
                }
            }
            Node::Inner(inner) => {
                let (next, sibling) = inner.step(depth, path);
                let child = self.update_node(Some(next), depth + 1, path, leaf, orphans)?;
                self.orphan(&node, orphans);
                Ok(Arc::new(Node::Inner(InnerNode::ordered(
                    depth,
                    path,
                    child,
                    sibling.clone(),
                ))))
            }
            Node::Extension(extension) => match extension.diverging_bit(path) {
                None => {
                    let child =
                        self.update_node(Some(extension.child()), extension.end(), path, leaf, orphans)?;
                    self.orphan(&node, orphans);
                    Ok(Arc::new(Node::Extension(extension.with_child(child))))
                }
                Some(bit) => {
                    self.orphan(&node, orphans);
                    let inner = Arc::new(Node::Inner(InnerNode::ordered(
                        bit,
                        path,
                        leaf,
                        extension.remainder(bit),
                    )));
                    Ok(extension.prefix(bit, inner))
                }
            },
            Node::Lazy(_) => Err(TreeError::CorruptNode("unresolved lazy node")),
        }
    }

    /// Removes `key`. Fails with [`TreeError::KeyNotFound`] if it is absent, in
    /// which case the trie is left untouched.
    pub fn delete(&mut self, key: &[u8]) -> Result<(), TreeError<DbError>> {
        let path = self.spec.path(key);
        let mut orphans = Vec::new();
        let root = self.delete_node(self.root.as_ref(), 0, &path, &mut orphans)?;
        trace!(path = %hex::encode(path), orphans = orphans.len(), "deleted key");
        self.root = root;
        self.orphans.push(orphans);
        Ok(())
    }

    fn delete_node(
        &self,
        node: Option<&Arc<Node<N>>>,
        depth: usize,
        path: &[u8; N],
        orphans: &mut Orphans,
    ) -> Result<Option<Arc<Node<N>>>, TreeError<DbError>> {
        let node = match node {
            Some(node) => self.resolve_lazy(node)?,
            None => None,
        };
        let Some(node) = node else {
            return Err(TreeError::KeyNotFound);
        };
        match node.as_ref() {
            Node::Leaf(existing) => {
                if existing.path() != path {
                    return Err(TreeError::KeyNotFound);
                }
                self.orphan(&node, orphans);
                Ok(None)
            }
            Node::Inner(inner) => {
                let (next, sibling) = inner.step(depth, path);
                let child = self.delete_node(Some(next), depth + 1, path, orphans)?;
                self.orphan(&node, orphans);
                match child {
                    Some(child) => Ok(Some(Arc::new(Node::Inner(InnerNode::ordered(
                        depth,
                        path,
                        child,
                        sibling.clone(),
                    ))))),
                    None => {
                        // the sibling is now alone under this level
                        let mut sibling_path = *path;
                        flip_bit(depth, &mut sibling_path);
                        self.extend(sibling, depth, depth + 1, &sibling_path, orphans)
                            .map(Some)
                    }
                }
            }
            Node::Extension(extension) => {
                if extension.diverging_bit(path).is_some() {
                    return Err(TreeError::KeyNotFound);
                }
                let child = self.delete_node(Some(extension.child()), extension.end(), path, orphans)?;
                self.orphan(&node, orphans);
                match child {
                    Some(child) => self
                        .extend(
                            &child,
                            extension.start(),
                            extension.end(),
                            extension.path(),
                            orphans,
                        )
                        .map(Some),
                    None => Ok(None),
                }
            }
            Node::Lazy(_) => Err(TreeError::CorruptNode("unresolved lazy node")),
        }
    }

    /// Hangs `node`, rooted at level `end`, below a run of single-child levels
    /// `[start, end)` whose bits are read from `path`.
    fn extend(
        &self,
        node: &Arc<Node<N>>,
        start: usize,
        end: usize,
        path: &[u8; N],
        orphans: &mut Orphans,
    ) -> Result<Arc<Node<N>>, TreeError<DbError>> {
        let node = self.resolve_lazy(node)?.ok_or(TreeError::NodeNotFound)?;
        match node.as_ref() {
            Node::Leaf(_) => Ok(node.clone()),
            Node::Extension(extension) => {
                self.orphan(&node, orphans);
                Ok(Arc::new(Node::Extension(extension.widened(start))))
            }
            Node::Inner(_) => Ok(Arc::new(Node::Extension(ExtensionNode::new(
                *path,
                start,
                end,
                node.clone(),
            )))),
            Node::Lazy(_) => Err(TreeError::CorruptNode("unresolved lazy node")),
        }
    }

    fn orphan(&self, node: &Node<N>, orphans: &mut Orphans) {
        if node.is_persisted() {
            orphans.push(node.digest(&self.spec).to_vec());
        }
    }

    /// Writes every new node to the store and removes the records orphaned
    /// since the last commit.
    pub fn commit(&mut self) -> Result<(), TreeError<DbError>> {
        let removed = self.pending_orphans();
        for digest in self.orphans.iter().flatten() {
            self.db.delete(digest)?;
        }
        // A failed write below may already have stored and flagged a node
        // sharing an orphan's digest, so a retry must not delete again.
        self.orphans.clear();
        let written = match &self.root {
            Some(root) => persist(self.db.as_mut(), &self.spec, root)?,
            None => 0,
        };
        let root = self.root_digest();
        debug!(root = %hex::encode(&root), written, removed, "committed trie");
        self.saved_root = Some(root);
        Ok(())
    }

    pub(super) fn resolve_root(&self) -> Result<Option<Arc<Node<N>>>, TreeError<DbError>> {
        match &self.root {
            Some(root) => self.resolve_lazy(root),
            None => Ok(None),
        }
    }

    /// Materialises `node` if it is lazy. `None` stands for the empty subtree.
    pub(super) fn resolve_lazy(
        &self,
        node: &Arc<Node<N>>,
    ) -> Result<Option<Arc<Node<N>>>, TreeError<DbError>> {
        match node.as_ref() {
            Node::Lazy(lazy) => self.load(lazy),
            _ => Ok(Some(node.clone())),
        }
    }

    /// Reads a lazy node once; later walks reuse the decoded node.
    pub(super) fn load(&self, lazy: &LazyNode<N>) -> Result<Option<Arc<Node<N>>>, TreeError<DbError>> {
        if let Some(node) = lazy.resolved() {
            return Ok(Some(node.clone()));
        }
        Ok(self.resolve(lazy.digest())?.map(|node| lazy.set_resolved(node)))
    }

    pub(super) fn resolve(&self, digest: &[u8]) -> Result<Option<Arc<Node<N>>>, TreeError<DbError>> {
        if self.spec.is_placeholder(digest) {
            return Ok(None);
        }
        trace!(digest = %hex::encode(digest), "resolving node");
        let record = self.db.get(digest)?.ok_or(TreeError::NodeNotFound)?;
        let node = Node::decode(&self.spec, &record, Some(digest.to_vec()))
            .map_err(TreeError::CorruptNode)?;
        Ok(Some(Arc::new(node)))
    }
}

/// Depth-first write of every node that is not yet in the store. Returns the
/// number of records written.
fn persist<const N: usize, H: Hasher<N>, DbError>(
    db: &mut dyn Db<DbError = DbError>,
    spec: &TrieSpec<N, H>,
    node: &Node<N>,
) -> Result<usize, TreeError<DbError>> {
    if node.is_persisted() {
        return Ok(0);
    }
    let mut written = match node {
        Node::Inner(inner) => persist(db, spec, inner.left())? + persist(db, spec, inner.right())?,
        Node::Extension(extension) => persist(db, spec, extension.child())?,
        _ => 0,
    };
    if let Some(record) = node.encode(spec) {
        db.set(node.digest(spec), &record)?;
        node.mark_persisted();
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod test {
    use sha2::Sha256;

    use super::SparseMerkleTrie;
    use crate::{error::MemoryDbError, MemoryDb, TreeError, TrieSpec};

    fn new_trie() -> SparseMerkleTrie<32, Sha256, MemoryDbError> {
        SparseMerkleTrie::new(Box::new(MemoryDb::new()), TrieSpec::new())
    }

    #[test]
    fn test_trie_new() {
        let trie = new_trie();
        assert_eq!(trie.root().as_bytes(), [0u8; 32].as_slice());
        assert_eq!(trie.saved_root(), None);
        assert_eq!(trie.get(b"missing").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_update_get() {
        let mut trie = new_trie();
        trie.update(b"key", b"value").unwrap();
        assert_eq!(trie.get(b"key").unwrap(), trie.spec().value_hash(b"value"));
        assert_eq!(trie.get(b"other").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_nothing_stored_before_commit() {
        let mut trie = new_trie();
        trie.update(b"a", b"1").unwrap();
        trie.update(b"b", b"2").unwrap();
        assert_eq!(trie.db().len().unwrap(), 0);
        trie.commit().unwrap();
        assert!(trie.db().len().unwrap() >= 3);
        assert_eq!(trie.saved_root(), Some(trie.root()));
    }

    #[test]
    fn test_delete_missing_key_leaves_trie_untouched() {
        let mut trie = new_trie();
        trie.update(b"a", b"1").unwrap();
        let root = trie.root();
        assert_eq!(trie.delete(b"b"), Err(TreeError::KeyNotFound));
        assert_eq!(trie.root(), root);
    }

    #[test]
    fn test_empty_value_deletes() {
        let mut trie = new_trie();
        trie.update(b"a", b"1").unwrap();
        trie.update(b"a", b"").unwrap();
        assert_eq!(trie.root().as_bytes(), [0u8; 32].as_slice());
        // absent key with empty value is a no-op
        trie.update(b"a", b"").unwrap();
    }

    #[test]
    fn test_commit_removes_orphans() {
        let mut trie = new_trie();
        trie.update(b"a", b"1").unwrap();
        trie.update(b"b", b"2").unwrap();
        trie.commit().unwrap();
        let records = trie.db().len().unwrap();
        trie.update(b"a", b"3").unwrap();
        assert!(trie.pending_orphans() > 0);
        trie.commit().unwrap();
        assert_eq!(trie.pending_orphans(), 0);
        assert_eq!(trie.db().len().unwrap(), records);
        trie.delete(b"a").unwrap();
        trie.delete(b"b").unwrap();
        trie.commit().unwrap();
        assert_eq!(trie.db().len().unwrap(), 0);
    }
}
