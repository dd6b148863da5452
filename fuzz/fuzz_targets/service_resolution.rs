#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_container::{Container, DiError, RequestScope, ReuseScope};
use std::sync::Arc;

struct Node {
    depth: u8,
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let container = Container::new();
    let depth = data[0] % 32;
    let cyclic = data[1] % 5 == 0;

    // A chain of named nodes, each resolving the next; optionally closed into a cycle
    for level in 0..depth {
        let next = if level + 1 == depth {
            if cyclic { Some(0) } else { None }
        } else {
            Some(level + 1)
        };
        container
            .register_named_fallible(&format!("node{}", level), move |c| {
                if let Some(next) = next {
                    c.resolve_named::<Arc<Node>>(&format!("node{}", next))?;
                }
                Ok(Arc::new(Node { depth: level }))
            })
            .unwrap()
            .reused_within(if data.len() > 2 && data[2] % 2 == 0 {
                ReuseScope::None
            } else {
                ReuseScope::Hierarchy
            });
    }

    let _request = RequestScope::begin();
    let child = container.create_child_container();
    match child.resolve_named::<Arc<Node>>("node0") {
        Ok(node) => {
            assert!(!cyclic);
            assert_eq!(node.depth, 0);
        }
        Err(DiError::Circular(path)) => assert!(cyclic && !path.is_empty()),
        Err(DiError::MissingRegistration { .. }) => assert_eq!(depth, 0),
        Err(other) => panic!("unexpected error: {}", other),
    }
});
