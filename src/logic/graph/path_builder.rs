use super::swap_path::SwapPath;
use super::swap_path_set::SwapPathSet;
use super::token_graph::TokenGraph;
use alloy_primitives::Address;
use petgraph::prelude::*;
use std::collections::VecDeque;
use tracing::{error, warn};

/// Upper limit of expanded search states for one call.
const MAX_SEARCH_ITERATIONS: usize = 500_000;

/// State of the search for all paths between two nodes in the graph.
#[derive(Debug)]
struct PathState {
    node: NodeIndex<usize>,
    current_path: SwapPath,
}

/// Find all simple paths from `token_in` to `token_out` with at most `max_hops` pools.
/// The search is performed in a depth-first manner over active pools only.
/// A path never visits a token twice, so it contains no pool twice either, and it ends as soon as it reaches `token_out`.
/// Collection stops after `max_paths` distinct paths.
pub fn find_all_paths(
    token_graph: &TokenGraph,
    token_in: Address,
    token_out: Address,
    max_hops: usize,
    max_paths: usize,
) -> eyre::Result<SwapPathSet> {
    let (Some(start_node), Some(end_node)) = (token_graph.token_index.get(&token_in), token_graph.token_index.get(&token_out)) else {
        // one of the tokens has no pool at all
        return Ok(SwapPathSet::new());
    };
    if start_node == end_node {
        return Err(eyre::eyre!("Start and end token must differ token={:#}", token_in));
    }
    let Some(start_token) = token_graph.graph.node_weight(*start_node).map(|node| node.token.clone()) else {
        return Err(eyre::eyre!("Start token not found in graph token={:#}", token_in));
    };

    let mut all_swap_paths = SwapPathSet::new();
    let mut stack = VecDeque::new();

    stack.push_back(PathState { node: *start_node, current_path: SwapPath::from_token(start_token) });

    let mut searched_path_counter = 0;

    while let Some(PathState { node, current_path }) = stack.pop_back() {
        // This is the upper limit to prevent infinite loops in case of a bug and limit the search space
        if searched_path_counter > MAX_SEARCH_ITERATIONS {
            error!(
                "Find all path too many iterations sanity check failed for token_in={:#}, token_out={:#}, max_hops={}, found={}",
                token_in,
                token_out,
                max_hops,
                all_swap_paths.len()
            );
            break;
        }
        searched_path_counter += 1;

        if node == *end_node {
            all_swap_paths.insert(current_path);
            if all_swap_paths.len() >= max_paths {
                warn!("Path limit reached token_in={:#}, token_out={:#}, max_paths={}", token_in, token_out, max_paths);
                break;
            }
            continue;
        }

        // If we've used all allowed hops, skip expansion
        if current_path.len() >= max_hops {
            continue;
        }

        for edge in token_graph.graph.edges(node) {
            let Some(to_token) = token_graph.graph.node_weight(edge.target()).map(|node| node.token.clone()) else {
                continue;
            };
            if current_path.contains_token(&to_token) {
                continue;
            }

            for pool in edge.weight().values() {
                if !pool.is_active {
                    continue;
                }

                let mut new_path = current_path.clone();
                if new_path.push_swap_hop(to_token.clone(), pool.inner.clone()).is_ok() {
                    stack.push_back(PathState { node: edge.target(), current_path: new_path });
                }
            }
        }
    }

    Ok(all_swap_paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::pools::{ConstantProductPool, PoolId, PoolWrapper};
    use crate::utils::Token;
    use alloy_primitives::U256;

    fn pool(token0: &Token, token1: &Token, address: u8) -> PoolWrapper {
        PoolWrapper::from(ConstantProductPool::new(
            Address::repeat_byte(address),
            token0.clone(),
            token1.clone(),
            U256::from(1000u64),
            U256::from(1000u64),
            0.003,
        ))
    }

    fn triangle() -> eyre::Result<(TokenGraph, Token, Token, Token)> {
        let token1 = Token::repeat_byte(1);
        let token2 = Token::repeat_byte(2);
        let token3 = Token::repeat_byte(3);

        let mut token_graph = TokenGraph::new();
        token_graph.add_pool(pool(&token1, &token2, 12))?;
        token_graph.add_pool(pool(&token2, &token3, 23))?;
        token_graph.add_pool(pool(&token3, &token1, 31))?;
        Ok((token_graph, token1, token2, token3))
    }

    #[test]
    fn test_simple_paths() -> eyre::Result<()> {
        let (token_graph, token1, _, token3) = triangle()?;

        let swap_paths = find_all_paths(&token_graph, token1.get_address(), token3.get_address(), 3, 100)?.sorted_vec();

        // direct pool and the detour over token2
        assert_eq!(swap_paths.len(), 2);
        assert_eq!(swap_paths[0].len(), 1);
        assert_eq!(swap_paths[1].len(), 2);
        for path in &swap_paths {
            assert_eq!(path.tokens.first().map(|t| t.get_address()), Some(token1.get_address()));
            assert_eq!(path.tokens.last().map(|t| t.get_address()), Some(token3.get_address()));
        }

        Ok(())
    }

    #[test]
    fn test_hop_limit() -> eyre::Result<()> {
        let (token_graph, token1, _, token3) = triangle()?;

        let swap_paths = find_all_paths(&token_graph, token1.get_address(), token3.get_address(), 1, 100)?;
        assert_eq!(swap_paths.len(), 1);

        Ok(())
    }

    #[test]
    fn test_parallel_pools_and_path_limit() -> eyre::Result<()> {
        let (mut token_graph, token1, token2, _) = triangle()?;
        token_graph.add_pool(pool(&token2, &token1, 21))?;

        let swap_paths = find_all_paths(&token_graph, token1.get_address(), token2.get_address(), 3, 100)?;
        // two direct pools plus the detour over token3
        assert_eq!(swap_paths.len(), 3);

        let limited = find_all_paths(&token_graph, token1.get_address(), token2.get_address(), 3, 2)?;
        assert_eq!(limited.len(), 2);

        Ok(())
    }

    #[test]
    fn test_inactive_pool_skipped() -> eyre::Result<()> {
        let (mut token_graph, token1, _, token3) = triangle()?;
        token_graph.set_pool_active(PoolId::Address(Address::repeat_byte(31)), false)?;

        let swap_paths = find_all_paths(&token_graph, token1.get_address(), token3.get_address(), 3, 100)?.sorted_vec();
        assert_eq!(swap_paths.len(), 1);
        assert_eq!(swap_paths[0].len(), 2);

        Ok(())
    }

    #[test]
    fn test_not_connected_path() -> eyre::Result<()> {
        let token1 = Token::repeat_byte(1);
        let token2 = Token::repeat_byte(2);
        let token3 = Token::repeat_byte(3);
        let token4 = Token::repeat_byte(4);

        let mut token_graph = TokenGraph::new();
        token_graph.add_pool(pool(&token1, &token2, 12))?;
        // leave the gap
        token_graph.add_pool(pool(&token3, &token4, 34))?;

        let swap_paths = find_all_paths(&token_graph, token1.get_address(), token4.get_address(), 3, 100)?;
        assert!(swap_paths.is_empty());

        let unknown = find_all_paths(&token_graph, token1.get_address(), Address::repeat_byte(99), 3, 100)?;
        assert!(unknown.is_empty());

        assert!(find_all_paths(&token_graph, token1.get_address(), token1.get_address(), 3, 100).is_err());

        Ok(())
    }
}
