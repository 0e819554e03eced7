//! Derived signals - memos and the list/text helpers built on them.
//!
//! A memo is a plain [`Signal`] written by one internal effect. Readers
//! subscribe to the derived signal, never to the memo's inputs, so the compute
//! function runs once per upstream change no matter how many readers exist.

use std::cell::OnceCell;
use std::rc::Rc;

use super::effect::{create_effect, untrack};
use super::signal::{ReadSignal, Signal};

/// Create a read accessor backed by a derived signal recomputed from `compute`.
///
/// Downstream effects only re-run when the recomputed value differs.
pub fn create_memo<T, F>(compute: F) -> ReadSignal<T>
where
    T: PartialEq + 'static,
    F: Fn() -> T + 'static,
{
    let compute = Rc::new(compute);
    let slot: Rc<OnceCell<Signal<T>>> = Rc::new(OnceCell::new());

    let compute_for_effect = compute.clone();
    let slot_for_effect = slot.clone();
    create_effect(move || {
        let next = compute_for_effect();
        match slot_for_effect.get() {
            Some(derived) => derived.set(next),
            None => {
                let _ = slot_for_effect.set(Signal::new(next));
            }
        }
    });

    // The effect's eager first run has already filled the slot.
    slot.get_or_init(|| Signal::new(untrack(|| compute())))
        .read_only()
}

/// Project every element of `list` through `map` (which also receives the
/// element's position), keeping the result live as `list` changes.
pub fn map_list<T, U, F>(list: &ReadSignal<Vec<T>>, map: F) -> ReadSignal<Vec<U>>
where
    T: 'static,
    U: PartialEq + 'static,
    F: Fn(&T, usize) -> U + 'static,
{
    let list = list.clone();
    create_memo(move || {
        list.with(|items| {
            items
                .iter()
                .enumerate()
                .map(|(index, item)| map(item, index))
                .collect()
        })
    })
}

/// Fill positional `{}` placeholders in `template` from live text sources.
///
/// Placeholders without a matching argument are kept verbatim.
///
/// # Example
///
/// ```ignore
/// let count = signal(3);
/// let reader = count.clone();
/// let args: Vec<Rc<dyn Fn() -> String>> = vec![Rc::new(move || reader.get().to_string())];
/// let label = with_text("{} items", args);
/// assert_eq!(label.get(), "3 items");
/// ```
pub fn with_text(template: &str, args: Vec<Rc<dyn Fn() -> String>>) -> ReadSignal<String> {
    let template = template.to_string();
    create_memo(move || {
        let values: Vec<String> = args.iter().map(|arg| arg()).collect();
        fill_template(&template, &values)
    })
}

fn fill_template(template: &str, values: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut values = values.iter();

    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        match values.next() {
            Some(value) => out.push_str(value),
            None => out.push_str("{}"),
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{create_effect, signal};
    use std::cell::Cell;

    #[test]
    fn test_memo_recomputes_once_per_change() {
        let source = signal(2);
        let source_reader = source.clone();
        let computes = Rc::new(Cell::new(0));
        let computes_clone = computes.clone();

        let doubled = create_memo(move || {
            computes_clone.set(computes_clone.get() + 1);
            source_reader.get() * 2
        });

        // Several downstream readers.
        for _ in 0..3 {
            let doubled = doubled.clone();
            create_effect(move || {
                doubled.get();
            });
        }

        assert_eq!(computes.get(), 1, "memo computes eagerly once");
        source.set(5);
        assert_eq!(computes.get(), 2, "one recompute per upstream change");
        assert_eq!(doubled.get(), 10);
    }

    #[test]
    fn test_memo_equal_result_does_not_notify_readers() {
        let source = signal(1);
        let source_reader = source.clone();
        let parity = create_memo(move || source_reader.get() % 2);

        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let parity_reader = parity.clone();
        create_effect(move || {
            parity_reader.get();
            runs_clone.set(runs_clone.get() + 1);
        });

        source.set(3);
        assert_eq!(runs.get(), 1, "same parity should not reach readers");
        source.set(4);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_chained_memos_resolve_before_set_returns() {
        let base = signal(1);
        let base_reader = base.clone();
        let plus_one = create_memo(move || base_reader.get() + 1);
        let plus_one_reader = plus_one.clone();
        let times_ten = create_memo(move || plus_one_reader.get() * 10);

        base.set(4);
        assert_eq!(times_ten.get(), 50);
    }

    #[test]
    fn test_map_list_projects_with_index() {
        let items = signal(vec!["a", "b"]);
        let mapped = map_list(&items.read_only(), |item, index| format!("{index}:{item}"));

        assert_eq!(mapped.get(), vec!["0:a".to_string(), "1:b".to_string()]);
        items.set(vec!["z"]);
        assert_eq!(mapped.get(), vec!["0:z".to_string()]);
    }

    #[test]
    fn test_with_text_tracks_arguments() {
        let count = signal(3);
        let reader = count.clone();
        let args: Vec<Rc<dyn Fn() -> String>> = vec![
            Rc::new(move || reader.get().to_string()),
            Rc::new(|| "none".to_string()),
        ];
        let label = with_text("{} items, {} left", args);

        assert_eq!(label.get(), "3 items, none left");
        count.set(4);
        assert_eq!(label.get(), "4 items, none left");
    }

    #[test]
    fn test_fill_template_missing_arguments() {
        assert_eq!(fill_template("{} and {}", &["x".to_string()]), "x and {}");
        assert_eq!(fill_template("plain", &[]), "plain");
    }
}
