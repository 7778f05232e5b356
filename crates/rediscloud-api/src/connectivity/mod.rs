//! Network connectivity endpoints: VPC peering, Transit Gateway, PSC

pub mod peering;
pub mod psc;
pub mod transit_gateway;
