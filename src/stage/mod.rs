//! Pipeline stages.
//!
//! Each stage is a plain function of the configuration: it reads its
//! resolved inputs, produces its outputs, and returns a completion signal
//! (`Ok`) or a typed failure. Ordering between stages is the task graph's
//! job, never the stages' own.

pub mod clean;
pub mod compile;
pub mod statics;
pub mod style;

use rustc_hash::FxHashMap;

/// Resolve `$STAMP_*` variables in command arguments.
///
/// Replaces occurrences of `$STAMP_XXX` with actual values from the vars
/// map. Used by the compile and style stages to parameterize the external
/// tool commands from `stamp.toml`.
pub(crate) fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for (key, value) in vars {
                let pattern = format!("${}", key);
                result = result.replace(&pattern, value);
            }
            result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_args_simple() {
        let mut vars = FxHashMap::default();
        vars.insert("STAMP_ENTRY".into(), "/path/src/js/client.js".into());
        vars.insert("STAMP_OUTFILE".into(), "/path/tmp/public/js/client.js".into());

        let args = vec![
            "esbuild".into(),
            "--bundle".into(),
            "$STAMP_ENTRY".into(),
            "--outfile=$STAMP_OUTFILE".into(),
        ];

        let resolved = resolve_args(&args, &vars);
        assert_eq!(resolved[0], "esbuild");
        assert_eq!(resolved[2], "/path/src/js/client.js");
        assert_eq!(resolved[3], "--outfile=/path/tmp/public/js/client.js");
    }

    #[test]
    fn test_resolve_args_no_vars() {
        let vars = FxHashMap::default();
        let args = vec!["echo".into(), "hello".into()];
        let resolved = resolve_args(&args, &vars);
        assert_eq!(resolved, args);
    }

    #[test]
    fn test_resolve_args_multiple_vars_in_one_arg() {
        let mut vars = FxHashMap::default();
        vars.insert("STAMP_INPUT".into(), "/in.scss".into());
        vars.insert("STAMP_OUTPUT".into(), "/out.css".into());

        let args = vec!["$STAMP_INPUT:$STAMP_OUTPUT".into()];
        let resolved = resolve_args(&args, &vars);
        assert_eq!(resolved[0], "/in.scss:/out.css");
    }
}
