//! Control-flow nodes - `For` lists and `Switch`/`Case` branches.
//!
//! These are pure descriptions. Building one yields a host-invisible marker
//! node; its driver (see [`crate::driver`]) renders the children lazily and
//! re-renders them whenever the signal it depends on changes.
//!
//! # Dependencies
//!
//! - `For` depends on `each` only. The projector runs untracked, so signals
//!   read while mapping items do not re-trigger the list.
//! - `Switch` depends on `condition` only. Predicates run untracked.
//!
//! # Example
//!
//! ```ignore
//! let todos = signal(vec!["write".to_string(), "test".to_string()]);
//! let filter = signal(Filter::All);
//!
//! vbox(children![
//!     For::new(todos.clone(), |todo, _| label(todo.as_str()).into())
//!         .fallback(|| label("nothing to do").into()),
//!     Switch::new(filter.clone(), vec![
//!         Case::new(|f| *f == Filter::All, || label("all").into()),
//!         Case::new(|f| *f == Filter::Done, || label("done").into()),
//!     ])
//!     .fallback(|| label("active").into()),
//! ])
//! ```

use std::fmt;
use std::rc::Rc;

use crate::reactive::{ReadSignal, untrack};

use super::Node;

/// Produces a fresh declarative node each time a driver needs one.
pub type NodeFactory = Rc<dyn Fn() -> Node>;

/// A control-flow description.
#[derive(Clone)]
pub enum ControlFlow {
    For(For),
    Switch(Switch),
}

impl ControlFlow {
    pub fn key(&self) -> Option<&str> {
        match self {
            ControlFlow::For(list) => list.key.as_deref(),
            ControlFlow::Switch(branch) => branch.key.as_deref(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ControlFlow::For(_) => "For",
            ControlFlow::Switch(_) => "Switch",
        }
    }
}

impl fmt::Debug for ControlFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.label()).field("key", &self.key()).finish()
    }
}

// =============================================================================
// For
// =============================================================================

/// List projection: one rendered subtree per element of `each`.
#[derive(Clone)]
pub struct For {
    pub(crate) key: Option<String>,
    pub(crate) items: Rc<dyn Fn() -> Vec<Node>>,
    pub(crate) fallback: Option<NodeFactory>,
}

impl For {
    /// Project `each` through `map` (which also receives the item index).
    pub fn new<T, M>(each: impl Into<ReadSignal<Vec<T>>>, map: M) -> Self
    where
        T: Clone + 'static,
        M: Fn(&T, usize) -> Node + 'static,
    {
        let each = each.into();
        let items = move || {
            let values = each.get();
            untrack(|| {
                values
                    .iter()
                    .enumerate()
                    .map(|(index, value)| map(value, index))
                    .collect::<Vec<Node>>()
            })
        };
        Self {
            key: None,
            items: Rc::new(items),
            fallback: None,
        }
    }

    /// Node rendered in place of the list while it is empty.
    pub fn fallback(mut self, fallback: impl Fn() -> Node + 'static) -> Self {
        self.fallback = Some(Rc::new(fallback));
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

// =============================================================================
// Switch / Case
// =============================================================================

/// One branch of a [`Switch`]: a predicate over the condition and a renderer.
pub struct Case<C> {
    when: Rc<dyn Fn(&C) -> bool>,
    render: NodeFactory,
}

impl<C> Case<C> {
    pub fn new(when: impl Fn(&C) -> bool + 'static, render: impl Fn() -> Node + 'static) -> Self {
        Self {
            when: Rc::new(when),
            render: Rc::new(render),
        }
    }
}

/// Which case a branch selected.
#[derive(Clone)]
pub(crate) struct Selected {
    pub(crate) index: usize,
    pub(crate) render: NodeFactory,
}

/// Conditional rendering: the first case whose predicate holds wins.
#[derive(Clone)]
pub struct Switch {
    pub(crate) key: Option<String>,
    pub(crate) select: Rc<dyn Fn() -> Option<Selected>>,
    pub(crate) fallback: Option<NodeFactory>,
}

impl Switch {
    pub fn new<C>(condition: impl Into<ReadSignal<C>>, cases: Vec<Case<C>>) -> Self
    where
        C: Clone + 'static,
    {
        let condition = condition.into();
        let select = move || {
            let value = condition.get();
            untrack(|| {
                cases
                    .iter()
                    .enumerate()
                    .find(|(_, case)| (case.when)(&value))
                    .map(|(index, case)| Selected {
                        index,
                        render: case.render.clone(),
                    })
            })
        };
        Self {
            key: None,
            select: Rc::new(select),
            fallback: None,
        }
    }

    /// Node rendered when no case matches.
    pub fn fallback(mut self, fallback: impl Fn() -> Node + 'static) -> Self {
        self.fallback = Some(Rc::new(fallback));
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::label;
    use crate::reactive::{create_effect, signal};
    use std::cell::Cell;

    #[test]
    fn test_for_projects_items_in_order() {
        let items = signal(vec![1, 2, 3]);
        let list = For::new(items, |n, index| {
            label(format!("{index}:{n}")).key(format!("k{n}")).into()
        });

        let keys: Vec<Option<String>> = (list.items)().iter().map(Node::key).collect();
        assert_eq!(
            keys,
            vec![Some("k1".into()), Some("k2".into()), Some("k3".into())]
        );
    }

    #[test]
    fn test_for_tracks_each_but_not_map() {
        let items = signal(vec![1]);
        let side = signal(0);
        let side_reader = side.clone();
        let list = For::new(items.clone(), move |_, _| {
            side_reader.get();
            label("x").into()
        });

        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        create_effect(move || {
            (list.items)();
            runs_clone.set(runs_clone.get() + 1);
        });

        side.set(1);
        assert_eq!(runs.get(), 1, "signals read by map must not subscribe");
        items.set(vec![1, 2]);
        assert_eq!(runs.get(), 2, "each must subscribe");
    }

    #[test]
    fn test_switch_first_match_wins() {
        let condition = signal(10);
        let branch = Switch::new(
            condition.clone(),
            vec![
                Case::new(|n: &i32| *n > 5, || label("big").into()),
                Case::new(|n: &i32| *n > 0, || label("positive").into()),
            ],
        );

        assert_eq!((branch.select)().map(|s| s.index), Some(0));
        condition.set(3);
        assert_eq!((branch.select)().map(|s| s.index), Some(1));
        condition.set(-1);
        assert!((branch.select)().is_none(), "no case matches");
    }
}
