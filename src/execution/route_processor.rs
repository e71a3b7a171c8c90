use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, sol};
use serde::{Deserialize, Serialize};

sol! {
    /// Execution contract replaying an encoded route
    interface IRouteProcessor {
        function processRoute(
            address tokenIn,
            uint256 amountIn,
            address tokenOut,
            uint256 amountOutMin,
            address to,
            bytes memory route
        ) external payable returns (uint256 amountOut);

        function transferValueAndprocessRoute(
            address transferValueTo,
            uint256 amountValueTransfer,
            address tokenIn,
            uint256 amountIn,
            address tokenOut,
            uint256 amountOutMin,
            address to,
            bytes memory route
        ) external payable returns (uint256 amountOut);
    }
}

/// Arguments of a `processRoute` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallParameters {
    /// Input token, the native sentinel for the network's native asset
    pub token_in: Address,
    pub amount_in: U256,
    pub token_out: Address,
    pub amount_out_min: U256,
    pub to: Address,
    pub route_code: Bytes,
    /// Native value sent with the call
    pub value: U256,
}

impl CallParameters {
    pub fn process_route_calldata(&self) -> Bytes {
        IRouteProcessor::processRouteCall {
            tokenIn: self.token_in,
            amountIn: self.amount_in,
            tokenOut: self.token_out,
            amountOutMin: self.amount_out_min,
            to: self.to,
            route: self.route_code.clone(),
        }
        .abi_encode()
        .into()
    }

    /// Calldata forwarding `amount` of native value to `transfer_to` before the swap. The call value must
    /// cover `value + amount`.
    pub fn transfer_value_and_process_route_calldata(&self, transfer_to: Address, amount: U256) -> Bytes {
        IRouteProcessor::transferValueAndprocessRouteCall {
            transferValueTo: transfer_to,
            amountValueTransfer: amount,
            tokenIn: self.token_in,
            amountIn: self.amount_in,
            tokenOut: self.token_out,
            amountOutMin: self.amount_out_min,
            to: self.to,
            route: self.route_code.clone(),
        }
        .abi_encode()
        .into()
    }
}
