// Operation tree
//
// The program representation the pass manager schedules over: operations
// own regions, regions own blocks, blocks own operations. Ownership makes
// the tree acyclic by construction, and traversal is deterministic
// pre-order over regions/blocks/ops as written.

/// A node in the structural tree, named by a dialect-qualified operation
/// kind such as `"func.func"` or `"builtin.module"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    name: String,
    regions: Vec<Region>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    operations: Vec<Operation>,
}

impl Operation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            regions: Vec::new(),
        }
    }

    /// Builder-style constructor appending one region.
    pub fn with_region(mut self, region: Region) -> Self {
        self.regions.push(region);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dialect prefix of the operation name (the part before the first
    /// `.`), or the whole name for unqualified operations.
    pub fn dialect(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn regions_mut(&mut self) -> &mut [Region] {
        &mut self.regions
    }

    pub fn push_region(&mut self, region: Region) {
        self.regions.push(region);
    }

    /// Visits this operation and every transitively nested operation in
    /// pre-order.
    pub fn walk(&self, visit: &mut impl FnMut(&Operation)) {
        visit(self);
        for region in &self.regions {
            for block in &region.blocks {
                for op in &block.operations {
                    op.walk(visit);
                }
            }
        }
    }
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    /// A region with a single block holding the given operations.
    pub fn single_block(operations: Vec<Operation>) -> Self {
        Self {
            blocks: vec![Block { operations }],
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub fn push_block(&mut self, block: Block) {
        self.blocks.push(block);
    }
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ops(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn operations_mut(&mut self) -> &mut [Operation] {
        &mut self.operations
    }

    pub fn push_operation(&mut self, op: Operation) {
        self.operations.push(op);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_module() -> Operation {
        Operation::new("builtin.module").with_region(Region::single_block(vec![
            Operation::new("func.func").with_region(Region::single_block(vec![
                Operation::new("arith.addi"),
                Operation::new("func.return"),
            ])),
            Operation::new("func.func").with_region(Region::single_block(vec![
                Operation::new("func.return"),
            ])),
        ]))
    }

    #[test]
    fn walk_is_preorder_in_document_order() {
        let module = sample_module();
        let mut names = Vec::new();
        module.walk(&mut |op| names.push(op.name().to_string()));
        assert_eq!(
            names,
            [
                "builtin.module",
                "func.func",
                "arith.addi",
                "func.return",
                "func.func",
                "func.return",
            ]
        );
    }

    #[test]
    fn dialect_is_name_prefix() {
        assert_eq!(Operation::new("func.func").dialect(), "func");
        assert_eq!(Operation::new("module").dialect(), "module");
    }
}
