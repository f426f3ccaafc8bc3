//! Seeded synthetic networks for smoke runs.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use tm_core::geom::Point;
use tm_core::network::Network;

/// Placement coordinates span [0, SPAN] on both axes.
const SPAN: i64 = 1000;

/// Generate a random fan-in DAG of `nodes` nodes with a matching random
/// placement. Roughly a quarter of the nodes are primary inputs; every
/// other node draws two distinct fan-ins from the nodes before it, so the
/// result is acyclic by construction.
pub fn random_network(nodes: usize, seed: u64) -> (Network, Vec<Point>) {
    assert!(nodes >= 3, "synthetic network needs at least 3 nodes");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let inputs = (nodes / 4).max(2);
    let mut fanins: Vec<Vec<usize>> = Vec::with_capacity(nodes);
    for node in 0..nodes {
        if node < inputs {
            fanins.push(Vec::new());
            continue;
        }
        let a = rng.gen_range(0..node);
        let mut b = rng.gen_range(0..node);
        while b == a {
            b = rng.gen_range(0..node);
        }
        fanins.push(vec![a, b]);
    }

    let placement: Vec<Point> = (0..nodes)
        .map(|_| Point::new(rng.gen_range(0..=SPAN), rng.gen_range(0..=SPAN)))
        .collect();

    let network = Network::new(fanins).expect("generated fan-ins are acyclic");
    (network, placement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_network() {
        let (a, pa) = random_network(32, 9);
        let (b, pb) = random_network(32, 9);
        assert_eq!(pa, pb);
        for node in 0..a.len() {
            assert_eq!(a.fanins(node), b.fanins(node));
        }
    }

    #[test]
    fn different_seeds_differ() {
        let (_, pa) = random_network(32, 1);
        let (_, pb) = random_network(32, 2);
        assert_ne!(pa, pb);
    }

    #[test]
    fn shape_matches_the_request() {
        let (n, p) = random_network(40, 0);
        assert_eq!(n.len(), 40);
        assert_eq!(p.len(), 40);
        let inputs = (0..n.len()).filter(|&x| n.is_input(x)).count();
        assert_eq!(inputs, 10);
        for node in 10..n.len() {
            assert_eq!(n.fanins(node).len(), 2);
            assert_ne!(n.fanins(node)[0], n.fanins(node)[1]);
        }
    }
}
