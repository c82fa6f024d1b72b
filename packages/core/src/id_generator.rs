use crate::NodeId;

/// Sequential id allocator shared by every node of one tree.
///
/// Ids start at `"0"` and are never handed out twice, whether or not the
/// node is ever attached.
#[derive(Clone, Debug, Default)]
pub struct IDGenerator {
    count: u64,
}

impl IDGenerator {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> NodeId {
        let id = NodeId::from(self.count.to_string());
        self.count += 1;
        id
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let mut gen = IDGenerator::new();

        let id1 = gen.new_id();
        let id2 = gen.new_id();
        let id3 = gen.new_id();

        assert_eq!(id1.as_str(), "0");
        assert_eq!(id2.as_str(), "1");
        assert_eq!(id3.as_str(), "2");
        assert_eq!(gen.issued(), 3);
    }
}
