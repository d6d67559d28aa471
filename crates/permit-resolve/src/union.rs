//! Union-find over contact indices.
//!
//! Merges always keep the smaller root, so the final partition roots are
//! independent of merge order and identical input yields identical groups.

pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    /// Find the root of `i` with path compression.
    pub fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = i;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Merge the groups containing `a` and `b`, keeping the smaller index as
    /// root. Returns the surviving root.
    pub fn union(&mut self, a: usize, b: usize) -> usize {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return root_a;
        }
        let (keep, absorb) = if root_a < root_b {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        self.parent[absorb] = keep;
        self.size[keep] += self.size[absorb];
        keep
    }

    /// Size of the group containing `a`.
    pub fn group_size(&mut self, a: usize) -> usize {
        let root = self.find(a);
        self.size[root]
    }
}
