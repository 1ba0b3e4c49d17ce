use crate::ids::BlockId;
use crate::model::BlockSnapshot;

/// Visitor pattern for traversing block snapshots immutably
///
/// The default implementation walks the whole subtree depth-first.
/// Override `visit_block` to act on nodes; call `walk_block` to keep descending.
pub trait Visitor: Sized {
    fn visit_block(&mut self, block: &BlockSnapshot, depth: usize) {
        walk_block(self, block, depth);
    }
}

pub fn walk_block<V: Visitor>(visitor: &mut V, block: &BlockSnapshot, depth: usize) {
    for child in &block.children {
        visitor.visit_block(child, depth + 1);
    }
}

pub fn walk_blocks<V: Visitor>(visitor: &mut V, blocks: &[BlockSnapshot]) {
    for block in blocks {
        visitor.visit_block(block, 0);
    }
}

/// Collects every block id in pre-order
#[derive(Debug, Default)]
pub struct IdCollector {
    pub ids: Vec<BlockId>,
}

impl Visitor for IdCollector {
    fn visit_block(&mut self, block: &BlockSnapshot, depth: usize) {
        self.ids.push(block.id.clone());
        walk_block(self, block, depth);
    }
}

/// All ids in a forest, pre-order
pub fn collect_ids(blocks: &[BlockSnapshot]) -> Vec<BlockId> {
    let mut collector = IdCollector::default();
    walk_blocks(&mut collector, blocks);
    collector.ids
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DepthRecorder(Vec<(String, usize)>);

    impl Visitor for DepthRecorder {
        fn visit_block(&mut self, block: &BlockSnapshot, depth: usize) {
            self.0.push((block.id.to_string(), depth));
            walk_block(self, block, depth);
        }
    }

    fn forest() -> Vec<BlockSnapshot> {
        vec![
            BlockSnapshot::new("a", "").with_children(vec![
                BlockSnapshot::new("b", "").with_children(vec![BlockSnapshot::new("c", "")]),
            ]),
            BlockSnapshot::new("d", ""),
        ]
    }

    #[test]
    fn test_collect_ids_pre_order() {
        let ids: Vec<String> = collect_ids(&forest()).iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_depth_is_tracked() {
        let mut recorder = DepthRecorder(Vec::new());
        walk_blocks(&mut recorder, &forest());
        assert_eq!(
            recorder.0,
            vec![
                ("a".to_string(), 0),
                ("b".to_string(), 1),
                ("c".to_string(), 2),
                ("d".to_string(), 0),
            ]
        );
    }
}
