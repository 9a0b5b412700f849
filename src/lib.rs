pub mod error;
pub mod host;
pub mod mmu;
pub mod net;
pub mod rdma;
pub mod sim;
pub mod switch;
pub mod topo;

#[cfg(test)]
mod test;
