// Application boundary: ports the pipeline talks to

pub mod ports;
