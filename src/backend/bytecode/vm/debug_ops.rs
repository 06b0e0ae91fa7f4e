//! Debugging operations for the AVM.

use tracing::debug;

use super::Machine;

impl Machine<'_> {
    /// No effect on program state; reports where execution is
    pub(super) fn op_debug(&mut self, ip: usize) {
        debug!(
            target: "avm::vm::debug",
            ip,
            depth = self.depth,
            stack_depth = self.stack.size(),
            top = ?self.stack.at(0),
            "debug"
        );
    }
}
