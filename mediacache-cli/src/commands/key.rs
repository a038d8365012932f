//! Key derivation command.

use mediacache::config::ConfigFile;
use mediacache::key::KeyDeriver;

/// Deriver configured with the namespaces and schemes from the config file.
pub fn deriver_for(config: &ConfigFile) -> KeyDeriver {
    let cache_config = config.cache_config();
    KeyDeriver::with_options(
        cache_config.namespaces,
        cache_config.virtual_schemes,
        cache_config.memo_capacity,
    )
}

/// Print the cache key for an identity, optionally with the hashed form.
pub fn run(config: &ConfigFile, identity: &str, show_canonical: bool) {
    let deriver = deriver_for(config);
    if show_canonical {
        println!("canonical: {}", deriver.canonicalize(identity));
    }
    println!("{}", deriver.derive_key(identity));
}
