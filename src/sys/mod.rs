// Host-facing plumbing: the container runtime seam, its docker driver,
// the identity bind mount, and schema discovery.

pub mod traits;     // Runtime contract (build / run)
pub mod docker;     // docker CLI driver
pub mod mount;      // Host path == container path
pub mod discovery;  // .proto walk, header lint, grouping
