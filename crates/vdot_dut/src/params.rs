//! Build-time parameters of the dot-product pipeline.

/// Vector width and pipeline depth of a [`DotProduct`](crate::DotProduct).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DotProductParams {
    /// Number of elements in each input vector.
    pub size: usize,
    /// Rising clock edges, counting the one that samples the inputs, until
    /// `result_o` holds the sum. Values below 1 behave as 1.
    pub latency: u32,
}

impl DotProductParams {
    /// Parameters for a `size`-wide instance with the adder-tree latency.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            latency: Self::adder_tree_latency(size),
        }
    }

    /// Overrides the pipeline depth.
    pub fn with_latency(mut self, latency: u32) -> Self {
        self.latency = latency;
        self
    }

    /// Latency of a registered multiply stage, a balanced binary adder tree
    /// with one register per level, and a registered output:
    /// `2 + ceil(log2(size))`.
    ///
    /// This is the assumed worst-case bound the settle window must cover.
    /// For the default 10 000-element vectors it is 16 cycles, well inside the
    /// 100-cycle window the harness waits.
    pub fn adder_tree_latency(size: usize) -> u32 {
        2 + ceil_log2(size)
    }

    /// Number of internal stage registers ahead of `result_o`.
    pub fn stage_count(&self) -> usize {
        self.latency.max(1) as usize - 1
    }
}

fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}
