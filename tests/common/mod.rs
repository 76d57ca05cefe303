// Not every test binary uses every stub.
#[allow(dead_code)]
pub mod mocks;
