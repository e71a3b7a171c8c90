/// Execution Layer
///
/// This layer is responsible for:
/// - Encoding a found route into the byte layout the route processor contract replays
/// - Slippage bounded minimum output and native value forwarding
/// - ABI encoding of the route processor calls

pub mod route_encoder;
pub mod route_processor;

pub use route_encoder::{
    DecodedLeg, DecodedTokenBlock, EncodeOptions, RouteCommand, decode_route_code, encode_route_params, encode_route_params_with,
};
pub use route_processor::{CallParameters, IRouteProcessor};
