use crate::util::segmented_stack::{DEFAULT_MAX_CACHE_SIZE, DEFAULT_SEGMENT_SIZE};

/// The prefix of environment variables that override options, e.g. `PRESERVED_MARKS_THREADS=4`.
pub const ENV_VAR_PREFIX: &str = "PRESERVED_MARKS_";

fn always_valid<T>(_: &T) -> bool {
    true
}

macro_rules! options {
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($(#[$outer])* $name: $type[$validator] = $default),*);
    ];
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        /// Options of the preserved marks engine.
        ///
        /// `Options::default()` only holds the built-in defaults. Use
        /// [`Options::read_env_var_settings`] (or [`Options::from_env`]) to apply overrides from
        /// `PRESERVED_MARKS_*` environment variables.
        #[derive(Clone, Debug)]
        pub struct Options {
            $($(#[$outer])* pub $name: $type),*
        }
        impl Options {
            /// Set an option from its name and a string value. Returns `true` if the option is
            /// set. An unknown name, an unparsable value or a value rejected by the validator
            /// leaves the option unchanged and returns `false`.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    // Parse the given value from str (by env vars or by calling set_from_str()) to the right type
                    $(stringify!($name) => if let Ok(val) = val.parse::<$type>() {
                        // Validate
                        let validate_fn = $validator;
                        let is_valid = validate_fn(&val);
                        if is_valid {
                            // Only set value if valid.
                            self.$name = val;
                        } else {
                            warn!("Unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        warn!("Unable to set {}={:?}. Cannot parse value. Default value will be used.", s, val);
                        false
                    },)*
                    _ => {
                        warn!("Unknown option {}", s);
                        false
                    }
                }
            }

            /// If we have env vars that start with `PRESERVED_MARKS_` and match any option (such as
            /// `PRESERVED_MARKS_SEGMENT_SIZE`), we set the option to its value (if it is a valid value).
            pub fn read_env_var_settings(&mut self) {
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(ENV_VAR_PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { self.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                Options {
                    $($name: $default),*
                }
            }
        }
    ]
}

options! {
    /// Number of GC worker threads, and therefore the default number of preserved marks stacks.
    threads:            usize [|v: &usize| *v > 0] = num_cpus::get(),
    /// Number of entries in each segment of a preserved marks stack.
    segment_size:       usize [|v: &usize| *v > 0] = DEFAULT_SEGMENT_SIZE,
    /// Number of empty segments a stack keeps for reuse while it shrinks. Restoration releases
    /// them regardless.
    max_cache_size:     usize [always_valid] = DEFAULT_MAX_CACHE_SIZE,
    /// Restore (and adjust) with the worker pool if one is given. If false, always restore serially.
    parallel_restore:   bool  [always_valid] = true,
    /// Allocate the stacks in a phase-bound resource scope rather than as a durable allocation.
    transient_storage:  bool  [always_valid] = false,
}

impl Options {
    /// The default options, with overrides from environment variables applied.
    pub fn from_env() -> Self {
        let mut options = Options::default();
        options.read_env_var_settings();
        options
    }
}
