//! Template reconciliation: merges a feature's default template with a
//! user override, field by field.
//!
//! Every template spells out how each of its fields merges by calling one of
//! the helpers below; nothing is inferred from the field's type:
//!
//! - [`merge_value`]: override wins when present, else default.
//! - [`merge_nested`]: both present: recurse with the same per-field rule.
//! - [`merge_atomic`]: ordered lists (action timelines, label lists) are
//!   replaced wholesale by the override when present.
//!
//! Reconciliation is pure: it borrows both inputs and returns a new
//! template. Fields stay unresolved.

/// A template that can absorb a user override.
pub trait Reconcile: Clone {
    fn reconcile(&self, overrides: &Self) -> Self;
}

/// Override wins when present.
pub fn merge_value<T: Clone>(default: &Option<T>, overrides: &Option<T>) -> Option<T> {
    overrides.as_ref().or(default.as_ref()).cloned()
}

/// Nested template: merged field by field when both sides are present.
pub fn merge_nested<T: Reconcile>(default: &Option<T>, overrides: &Option<T>) -> Option<T> {
    match (default, overrides) {
        (Some(d), Some(o)) => Some(d.reconcile(o)),
        (None, Some(o)) => Some(o.clone()),
        (Some(d), None) => Some(d.clone()),
        (None, None) => None,
    }
}

/// Atomic field: never merged element-wise.
pub fn merge_atomic<T: Clone>(default: &Option<T>, overrides: &Option<T>) -> Option<T> {
    merge_value(default, overrides)
}

/// Reconcile an optional override against a default; an absent override
/// yields the default unchanged.
pub fn reconcile_with<T: Reconcile>(default: &T, overrides: Option<&T>) -> T {
    match overrides {
        Some(o) => default.reconcile(o),
        None => default.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Inner {
        a: Option<i64>,
        b: Option<i64>,
    }

    impl Reconcile for Inner {
        fn reconcile(&self, o: &Self) -> Self {
            Self {
                a: merge_value(&self.a, &o.a),
                b: merge_value(&self.b, &o.b),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Outer {
        name: Option<String>,
        inner: Option<Inner>,
        steps: Option<Vec<Inner>>,
    }

    impl Reconcile for Outer {
        fn reconcile(&self, o: &Self) -> Self {
            Self {
                name: merge_value(&self.name, &o.name),
                inner: merge_nested(&self.inner, &o.inner),
                steps: merge_atomic(&self.steps, &o.steps),
            }
        }
    }

    fn default_outer() -> Outer {
        Outer {
            name: Some("default".into()),
            inner: Some(Inner {
                a: Some(1),
                b: Some(2),
            }),
            steps: Some(vec![
                Inner {
                    a: Some(10),
                    b: Some(11),
                },
                Inner {
                    a: Some(20),
                    b: Some(21),
                },
            ]),
        }
    }

    #[test]
    fn test_empty_override_is_identity() {
        let d = default_outer();
        assert_eq!(d.reconcile(&Outer::default()), d);
        assert_eq!(reconcile_with(&d, None), d);
    }

    #[test]
    fn test_nested_merges_per_field() {
        let d = default_outer();
        let o = Outer {
            inner: Some(Inner {
                a: None,
                b: Some(99),
            }),
            ..Outer::default()
        };
        let merged = d.reconcile(&o);
        assert_eq!(
            merged.inner,
            Some(Inner {
                a: Some(1),
                b: Some(99)
            })
        );
        assert_eq!(merged.name, d.name);
    }

    #[test]
    fn test_atomic_replaced_wholesale() {
        let d = default_outer();
        let o = Outer {
            steps: Some(vec![Inner {
                a: Some(5),
                b: None,
            }]),
            ..Outer::default()
        };
        let merged = d.reconcile(&o);
        // Override list is kept as-is; the missing `b` is not filled from the default
        assert_eq!(merged.steps, o.steps);
    }

    #[test]
    fn test_inputs_untouched() {
        let d = default_outer();
        let o = Outer {
            name: Some("override".into()),
            ..Outer::default()
        };
        let (d_before, o_before) = (d.clone(), o.clone());
        let merged = d.reconcile(&o);
        assert_eq!(merged.name.as_deref(), Some("override"));
        assert_eq!(d, d_before);
        assert_eq!(o, o_before);
    }
}
