//! Configuration normalizer
//!
//! Converts user-facing [`InputOptions`]/[`OutputOptions`] into a
//! [`CanonicalRequest`]. Normalization is deterministic: the same options always
//! produce an equal request, so re-deriving it is safe at any time.

use std::path::PathBuf;
use tracing::warn;

use crate::error::{Error, Result, ResultExt};
use crate::options::{
    ExternalOption, InjectImportOption, InputOption, InputOptions, JsxMode, JsxOptions,
    OutputOptions, PatternsOption, PluginOption, ResolveOptions, StringOrRegex, WatchOptions,
};
use crate::plugin::{normalize_builtin, LocalPluginDescriptor, PluginDescriptor};
use crate::request::{
    AliasItem, CanonicalRequest, ExperimentalRequest, ExtensionAliasItem, ExternalMatcher,
    InjectImport, InputItem, JsxRequest, LogHandler, LogLevel, NotifyRequest, OutputRequest,
    ResolveRequest, WatchRequest,
};

/// Second element of an inject pair that selects a namespace import
pub const NAMESPACE_IMPORT_MARKER: &str = "*";

/// Imported name used when an inject value is a bare module path
pub const DEFAULT_IMPORT_NAME: &str = "default";

const DEFAULT_OUTPUT_DIR: &str = "dist";

/// Build the canonical request for one session
///
/// Fails fast with [`Error::Config`] on unsupported values (e.g. an unknown log
/// level) so that no session is ever started from a broken configuration.
pub fn normalize(options: &InputOptions, output: &OutputOptions) -> Result<CanonicalRequest> {
    let log_level = normalize_log_level(options.log_level.as_deref())?;

    let cwd = match &options.cwd {
        Some(cwd) => cwd.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    let plugins = options
        .plugins
        .iter()
        .map(normalize_plugin)
        .collect::<Result<Vec<_>>>()?;

    let experimental = options
        .experimental
        .as_ref()
        .map(|e| ExperimentalRequest {
            strict_execution_order: e.strict_execution_order,
            disable_live_bindings: e.disable_live_bindings,
        })
        .unwrap_or_default();

    let output_dir = output
        .dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    Ok(CanonicalRequest {
        input: normalize_input(&options.input),
        external: options.external.as_ref().map(normalize_external),
        resolve: options.resolve.as_ref().map(normalize_resolve),
        platform: options.platform,
        shim_missing_exports: options.shim_missing_exports,
        log_level,
        on_log: options.on_log.clone().map(LogHandler::new),
        treeshake: options.treeshake,
        module_types: options.module_types.clone(),
        define: options.define.clone(),
        inject: options.inject.as_ref().map(|entries| {
            entries
                .iter()
                .map(|(alias, item)| normalize_inject(alias, item))
                .collect()
        }),
        experimental,
        profiler_names: options.profiler_names,
        jsx: options.jsx.as_ref().map(normalize_jsx),
        watch: options.watch.as_ref().map(normalize_watch),
        drop_labels: options.drop_labels.clone(),
        plugins,
        output: OutputRequest {
            dir: cwd.join(output_dir),
        },
        cwd,
    })
}

/// Map a log level token to its ordinal; anything unknown is fatal
pub fn normalize_log_level(level: Option<&str>) -> Result<LogLevel> {
    match level {
        None | Some("info") => Ok(LogLevel::Info),
        Some("silent") => Ok(LogLevel::Silent),
        Some("warn") => Ok(LogLevel::Warn),
        Some("debug") => Ok(LogLevel::Debug),
        Some(other) => Err(Error::config(format!("Unexpected log level: {other}"))),
    }
}

fn normalize_input(input: &InputOption) -> Vec<InputItem> {
    match input {
        InputOption::List(paths) => paths
            .iter()
            .map(|import| InputItem {
                name: None,
                import: import.clone(),
            })
            .collect(),
        InputOption::Map(entries) => entries
            .iter()
            .map(|(name, import)| InputItem {
                name: Some(name.clone()),
                import: import.clone(),
            })
            .collect(),
    }
}

fn normalize_patterns(patterns: &PatternsOption) -> Vec<StringOrRegex> {
    match patterns {
        PatternsOption::Single(pattern) => vec![pattern.clone()],
        PatternsOption::List(patterns) => patterns.clone(),
    }
}

fn normalize_external(external: &ExternalOption) -> ExternalMatcher {
    match external {
        ExternalOption::Function(f) => ExternalMatcher::Function(f.clone()),
        ExternalOption::Patterns(patterns) => ExternalMatcher::Patterns(normalize_patterns(patterns)),
    }
}

fn normalize_resolve(resolve: &ResolveOptions) -> ResolveRequest {
    ResolveRequest {
        alias: resolve.alias.as_ref().map(|alias| {
            alias
                .iter()
                .map(|(find, replacement)| AliasItem {
                    find: find.clone(),
                    replacements: vec![replacement.clone()],
                })
                .collect()
        }),
        extension_alias: resolve.extension_alias.as_ref().map(|alias| {
            alias
                .iter()
                .map(|(target, replacements)| ExtensionAliasItem {
                    target: target.clone(),
                    replacements: replacements.clone(),
                })
                .collect()
        }),
        alias_fields: resolve.alias_fields.clone(),
        condition_names: resolve.condition_names.clone(),
        exports_fields: resolve.exports_fields.clone(),
        extensions: resolve.extensions.clone(),
        main_fields: resolve.main_fields.clone(),
        main_files: resolve.main_files.clone(),
        modules: resolve.modules.clone(),
        symlinks: resolve.symlinks,
        tsconfig_filename: resolve.tsconfig_filename.clone(),
    }
}

fn normalize_inject(alias: &str, item: &InjectImportOption) -> InjectImport {
    match item {
        // fs: ["node:fs", "*"]  =>  import * as fs from "node:fs"
        InjectImportOption::Pair(from, imported) if imported == NAMESPACE_IMPORT_MARKER => {
            InjectImport::Namespace {
                alias: alias.to_string(),
                from: from.clone(),
            }
        }
        // P: ["es6-promise", "Promise"]  =>  import { Promise as P } from "es6-promise"
        InjectImportOption::Pair(from, imported) => InjectImport::Named {
            alias: alias.to_string(),
            from: from.clone(),
            imported: imported.clone(),
        },
        // $: "jquery"  =>  import $ from "jquery"
        InjectImportOption::Source(from) => InjectImport::Named {
            alias: alias.to_string(),
            from: from.clone(),
            imported: DEFAULT_IMPORT_NAME.to_string(),
        },
    }
}

fn normalize_jsx(jsx: &JsxOptions) -> JsxRequest {
    let mode = jsx.mode.unwrap_or(JsxMode::Classic);
    let import_source = match mode {
        JsxMode::Classic => jsx.import_source.clone(),
        JsxMode::Automatic => jsx.jsx_import_source.clone(),
        JsxMode::Preserve => None,
    };
    JsxRequest {
        runtime: mode.as_str().to_string(),
        import_source,
        pragma: jsx.factory.clone(),
        pragma_frag: jsx.fragment.clone(),
        development: jsx.development,
        refresh: jsx.refresh,
    }
}

fn normalize_watch(watch: &WatchOptions) -> WatchRequest {
    if watch.chokidar.is_some() {
        warn!("The watch chokidar option is deprecated, please use notify options instead of it.");
    }
    WatchRequest {
        skip_write: watch.skip_write,
        include: watch
            .include
            .as_ref()
            .map(normalize_patterns)
            .unwrap_or_default(),
        exclude: watch
            .exclude
            .as_ref()
            .map(normalize_patterns)
            .unwrap_or_default(),
        notify: watch.notify.as_ref().map(|notify| NotifyRequest {
            poll_interval: notify.poll_interval,
            compare_contents: notify.compare_contents,
        }),
    }
}

fn normalize_plugin(plugin: &PluginOption) -> Result<Option<PluginDescriptor>> {
    match plugin {
        PluginOption::Parallel(_) => Ok(None),
        PluginOption::Builtin(builtin) => {
            Ok(Some(PluginDescriptor::Builtin(normalize_builtin(builtin)?)))
        }
        PluginOption::Local(local) => Ok(Some(PluginDescriptor::Local(
            LocalPluginDescriptor::new(local),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ExternalFn, NotifyOptions};
    use crate::plugin::{BuiltinPlugin, BuiltinPluginName, ParallelPlugin};
    use pretty_assertions::assert_eq;
    use regex::Regex;
    use std::time::Duration;

    fn base_options() -> InputOptions {
        InputOptions {
            input: InputOption::from("src/main.js"),
            cwd: Some(PathBuf::from("/project")),
            ..Default::default()
        }
    }

    #[test]
    fn test_list_input_is_unnamed() {
        let options = InputOptions {
            input: InputOption::List(vec!["a.js".to_string(), "b.js".to_string()]),
            ..base_options()
        };
        let request = normalize(&options, &OutputOptions::default()).expect("valid options");
        assert_eq!(
            request.input,
            vec![
                InputItem {
                    name: None,
                    import: "a.js".to_string()
                },
                InputItem {
                    name: None,
                    import: "b.js".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_map_input_keeps_names_in_order() {
        let options = InputOptions {
            input: InputOption::Map(vec![
                ("vendor".to_string(), "src/vendor.js".to_string()),
                ("app".to_string(), "src/app.js".to_string()),
            ]),
            ..base_options()
        };
        let request = normalize(&options, &OutputOptions::default()).expect("valid options");
        let names: Vec<_> = request.input.iter().map(|i| i.name.as_deref()).collect();
        assert_eq!(names, vec![Some("vendor"), Some("app")]);
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(normalize_log_level(None).expect("default"), LogLevel::Info);
        assert_eq!(normalize_log_level(Some("silent")).expect("valid"), LogLevel::Silent);
        assert_eq!(normalize_log_level(Some("warn")).expect("valid"), LogLevel::Warn);
        assert_eq!(normalize_log_level(Some("debug")).expect("valid"), LogLevel::Debug);
    }

    #[test]
    fn test_unknown_log_level_is_fatal() {
        let options = InputOptions {
            log_level: Some("verbose".to_string()),
            ..base_options()
        };
        let err = normalize(&options, &OutputOptions::default()).unwrap_err();
        assert!(err.is_config());
        assert_eq!(err.to_string(), "Configuration error: Unexpected log level: verbose");
    }

    #[test]
    fn test_external_patterns_are_flattened() {
        let options = InputOptions {
            external: Some(ExternalOption::Patterns(PatternsOption::List(vec![
                StringOrRegex::from("react"),
                StringOrRegex::Regex(Regex::new(r"^node:").expect("valid regex")),
            ]))),
            ..base_options()
        };
        let request = normalize(&options, &OutputOptions::default()).expect("valid options");
        let external = request.external.expect("external configured");
        assert!(external.is_external("react", None, false));
        assert!(external.is_external("node:path", None, false));
        assert!(!external.is_external("reactive", None, false));
    }

    #[test]
    fn test_external_single_string() {
        let options = InputOptions {
            external: Some(ExternalOption::Patterns(PatternsOption::from("vue"))),
            ..base_options()
        };
        let request = normalize(&options, &OutputOptions::default()).expect("valid options");
        assert_eq!(
            request.external,
            Some(ExternalMatcher::Patterns(vec![StringOrRegex::from("vue")]))
        );
    }

    #[test]
    fn test_external_function_guards_virtual_modules() {
        let options = InputOptions {
            external: Some(ExternalOption::Function(ExternalFn::new(|id, _, _| {
                if id == "undecided" {
                    None
                } else {
                    Some(true)
                }
            }))),
            ..base_options()
        };
        let request = normalize(&options, &OutputOptions::default()).expect("valid options");
        let external = request.external.expect("external configured");
        assert!(external.is_external("lodash", None, true));
        assert!(!external.is_external("\0commonjs-helpers", None, true));
        assert!(!external.is_external("undecided", None, true));
    }

    #[test]
    fn test_resolve_alias_becomes_replacement_lists() {
        let options = InputOptions {
            resolve: Some(ResolveOptions {
                alias: Some(vec![("@".to_string(), "./src".to_string())]),
                extension_alias: Some(vec![(
                    ".js".to_string(),
                    vec![".ts".to_string(), ".js".to_string()],
                )]),
                symlinks: Some(false),
                ..Default::default()
            }),
            ..base_options()
        };
        let request = normalize(&options, &OutputOptions::default()).expect("valid options");
        let resolve = request.resolve.expect("resolve configured");
        assert_eq!(
            resolve.alias,
            Some(vec![AliasItem {
                find: "@".to_string(),
                replacements: vec!["./src".to_string()],
            }])
        );
        assert_eq!(
            resolve.extension_alias,
            Some(vec![ExtensionAliasItem {
                target: ".js".to_string(),
                replacements: vec![".ts".to_string(), ".js".to_string()],
            }])
        );
        assert_eq!(resolve.symlinks, Some(false));
    }

    #[test]
    fn test_inject_shapes() {
        let options = InputOptions {
            inject: Some(vec![
                ("fs".to_string(), InjectImportOption::from(("node:fs", "*"))),
                ("P".to_string(), InjectImportOption::from(("es6-promise", "Promise"))),
                ("$".to_string(), InjectImportOption::from("jquery")),
            ]),
            ..base_options()
        };
        let request = normalize(&options, &OutputOptions::default()).expect("valid options");
        assert_eq!(
            request.inject,
            Some(vec![
                InjectImport::Namespace {
                    alias: "fs".to_string(),
                    from: "node:fs".to_string(),
                },
                InjectImport::Named {
                    alias: "P".to_string(),
                    from: "es6-promise".to_string(),
                    imported: "Promise".to_string(),
                },
                InjectImport::Named {
                    alias: "$".to_string(),
                    from: "jquery".to_string(),
                    imported: "default".to_string(),
                },
            ])
        );
    }

    #[test]
    fn test_jsx_import_source_depends_on_mode() {
        let jsx = JsxOptions {
            import_source: Some("classic-src".to_string()),
            jsx_import_source: Some("automatic-src".to_string()),
            factory: Some("h".to_string()),
            fragment: Some("Fragment".to_string()),
            development: Some(true),
            ..Default::default()
        };

        let classic = normalize_jsx(&jsx);
        assert_eq!(classic.runtime, "classic");
        assert_eq!(classic.import_source.as_deref(), Some("classic-src"));
        assert_eq!(classic.pragma.as_deref(), Some("h"));
        assert_eq!(classic.pragma_frag.as_deref(), Some("Fragment"));

        let automatic = normalize_jsx(&JsxOptions {
            mode: Some(JsxMode::Automatic),
            ..jsx.clone()
        });
        assert_eq!(automatic.runtime, "automatic");
        assert_eq!(automatic.import_source.as_deref(), Some("automatic-src"));
        assert_eq!(automatic.development, Some(true));

        let preserve = normalize_jsx(&JsxOptions {
            mode: Some(JsxMode::Preserve),
            ..jsx
        });
        assert_eq!(preserve.import_source, None);
        assert_eq!(preserve.pragma.as_deref(), Some("h"));
    }

    #[test]
    fn test_watch_options() {
        let options = InputOptions {
            watch: Some(WatchOptions {
                skip_write: true,
                include: Some(PatternsOption::from("src/**")),
                exclude: Some(PatternsOption::List(vec![
                    StringOrRegex::from("main.js"),
                    StringOrRegex::Regex(Regex::new(r"\.css$").expect("valid regex")),
                ])),
                notify: Some(NotifyOptions {
                    poll_interval: Some(Duration::from_millis(250)),
                    compare_contents: true,
                }),
                chokidar: None,
            }),
            ..base_options()
        };
        let request = normalize(&options, &OutputOptions::default()).expect("valid options");
        let watch = request.watch_options();
        assert!(watch.skip_write);
        assert_eq!(watch.include, vec![StringOrRegex::from("src/**")]);
        assert_eq!(watch.exclude.len(), 2);
        assert_eq!(
            watch.notify,
            Some(NotifyRequest {
                poll_interval: Some(Duration::from_millis(250)),
                compare_contents: true,
            })
        );
    }

    #[test]
    fn test_legacy_watch_backend_only_warns() {
        let options = InputOptions {
            watch: Some(WatchOptions {
                chokidar: Some(serde_json::json!({ "usePolling": true })),
                ..Default::default()
            }),
            ..base_options()
        };
        let request = normalize(&options, &OutputOptions::default()).expect("warning only");
        assert_eq!(request.watch_options(), WatchRequest::default());
    }

    #[test]
    fn test_plugins_normalize_per_kind() {
        let options = InputOptions {
            plugins: vec![
                PluginOption::Parallel(ParallelPlugin {
                    file_url: "file:///plugins/worker.js".to_string(),
                    options: serde_json::Value::Null,
                }),
                PluginOption::Builtin(BuiltinPlugin::new(BuiltinPluginName::DynamicImportVars)),
            ],
            ..base_options()
        };
        let request = normalize(&options, &OutputOptions::default()).expect("valid options");
        assert_eq!(request.plugins.len(), 2);
        assert!(request.plugins[0].is_none());
        assert_eq!(
            request.plugins[1].as_ref().map(|p| p.name()),
            Some("builtin:dynamic-import-vars")
        );
    }

    #[test]
    fn test_invalid_builtin_options_are_fatal() {
        let options = InputOptions {
            plugins: vec![PluginOption::Builtin(BuiltinPlugin::with_options(
                BuiltinPluginName::Alias,
                serde_json::json!({ "entries": "nope" }),
            ))],
            ..base_options()
        };
        assert!(normalize(&options, &OutputOptions::default())
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn test_output_dir_defaults_to_dist_under_cwd() {
        let request = normalize(&base_options(), &OutputOptions::default()).expect("valid");
        assert_eq!(request.output.dir, PathBuf::from("/project/dist"));

        let request = normalize(
            &base_options(),
            &OutputOptions {
                dir: Some(PathBuf::from("build/out")),
            },
        )
        .expect("valid");
        assert_eq!(request.output.dir, PathBuf::from("/project/build/out"));
    }

    #[test]
    fn test_missing_cwd_uses_process_directory() {
        let options = InputOptions {
            cwd: None,
            ..base_options()
        };
        let request = normalize(&options, &OutputOptions::default()).expect("valid");
        assert_eq!(
            request.cwd,
            std::env::current_dir().expect("test setup failed")
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let options = InputOptions {
            external: Some(ExternalOption::Function(ExternalFn::new(|_, _, _| None))),
            define: Some(vec![("__DEV__".to_string(), "false".to_string())]),
            drop_labels: Some(vec!["DEBUG".to_string()]),
            jsx: Some(JsxOptions::default()),
            watch: Some(WatchOptions {
                exclude: Some(PatternsOption::from(
                    Regex::new(r"node_modules").expect("valid regex"),
                )),
                ..Default::default()
            }),
            ..base_options()
        };
        let first = normalize(&options, &OutputOptions::default()).expect("valid");
        let second = normalize(&options, &OutputOptions::default()).expect("valid");
        assert_eq!(first, second);
    }
}
