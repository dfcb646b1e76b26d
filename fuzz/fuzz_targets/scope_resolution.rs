#![no_main]

use ferrous_tree_di::{to_existing, to_factory, to_value, Provider, Registry, Resolver, Token};
use libfuzzer_sys::fuzz_target;

// Each byte pair drives one step: (op, argument)
fuzz_target!(|data: &[u8]| {
    let registry = Registry::new();
    let mut providers = vec![Provider::new("Root")];
    let mut scopes = vec![providers[0].create_root(&registry)];

    for step in data.chunks(2) {
        let op = step[0] % 6;
        let arg = step.get(1).copied().unwrap_or(0);
        let name = format!("t{}", arg % 8);
        let scope = scopes[arg as usize % scopes.len()].clone();

        match op {
            0 => scope.provider().register([(name, to_value(arg as u32))]),
            1 => {
                let target = format!("t{}", (arg / 8) % 8);
                scope.provider().register([(name, to_existing(target))]);
            }
            2 => {
                let nested = format!("t{}", (arg / 8) % 8);
                scope
                    .provider()
                    .register([(name, to_factory(move |ctx| ctx.get::<u32>(&Token::name(nested.clone())).map(|n| *n + 1).unwrap_or(0)))]);
            }
            3 => {
                let provider = Provider::new(format!("P{}", providers.len()));
                scopes.push(provider.create_child(&scope));
                providers.push(provider);
            }
            4 => {
                let _ = scope.get_instance(&Token::name(name));
            }
            _ => {
                scope.unmount();
            }
        }
    }

    for scope in scopes.iter().rev() {
        scope.unmount();
    }
});
