#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_container::{Container, Owner, ReuseScope};
use std::sync::Arc;

fn reuse_from(byte: u8) -> ReuseScope {
    match byte % 4 {
        0 => ReuseScope::Hierarchy,
        1 => ReuseScope::Container,
        2 => ReuseScope::None,
        _ => ReuseScope::Request,
    }
}

// Each input byte pair is one operation on a small tree of containers
fuzz_target!(|data: &[u8]| {
    let root = Container::new();
    let mut containers = vec![root.clone()];

    for op in data.chunks(2) {
        let target = containers[op[0] as usize % containers.len()].clone();
        let arg = op.get(1).copied().unwrap_or(0);

        match op[0] % 6 {
            0 => {
                let _ = target
                    .register(move |_| Arc::new(arg as u64))
                    .map(|r| r.reused_within(reuse_from(arg)));
            }
            1 => {
                let name = format!("n{}", arg % 4);
                let _ = target.register_named(&name, move |_| arg as u32);
            }
            2 => {
                let _ = target
                    .register_with(|_, x: u8| Ok(x as u16 * 2))
                    .map(|r| r.owned_by(if arg % 2 == 0 { Owner::Container } else { Owner::External }));
            }
            3 => {
                if containers.len() < 16 {
                    containers.push(target.create_child_container());
                }
            }
            4 => target.set_default_reuse(reuse_from(arg)),
            _ => {
                let _ = target.register_instance(arg);
            }
        }
    }

    for container in &containers {
        if let Some(value) = container.try_resolve::<Arc<u64>>() {
            assert!(*value <= u8::MAX as u64);
        }
        if let Ok(doubled) = container.resolve_with::<u16, u8>(21) {
            assert_eq!(doubled, 42);
        }
        assert_eq!(container.exists::<u8>(), container.try_resolve::<u8>().is_some());
    }

    root.dispose().unwrap();
});
