//! Lenient, string-labelled enumerations.
//!
//! Patch fields that select a variant by name (waveforms, macro models, arp
//! modes, modulation targets, ...) are declared through [`lenient_enum!`].
//! Every such enum serializes to its label and deserializes from any string:
//! labels it does not recognise resolve to the declared default variant, so a
//! patch written by a newer editor still loads.

macro_rules! lenient_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $label:literal ),+ $(,)?
        }
        default = $default:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(from = "String", into = "&'static str")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Resolve a label, falling back to the default variant.
            pub fn from_name(name: &str) -> Self {
                match name {
                    $($label => $name::$variant,)+
                    _ => $name::$default,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                Self::from_name(&name)
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.as_str()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use lenient_enum;

#[cfg(test)]
mod tests {
    lenient_enum! {
        /// Test-only enum.
        pub enum Color {
            Red = "red",
            Green = "green",
        }
        default = Green;
    }

    #[test]
    fn unknown_label_falls_back_to_default() {
        let parsed: Color = serde_json::from_str("\"ultraviolet\"").unwrap();
        assert_eq!(parsed, Color::Green);
    }

    #[test]
    fn labels_serialize_verbatim() {
        assert_eq!(serde_json::to_string(&Color::Red).unwrap(), "\"red\"");
        let parsed: Color = serde_json::from_str("\"red\"").unwrap();
        assert_eq!(parsed, Color::Red);
    }
}
