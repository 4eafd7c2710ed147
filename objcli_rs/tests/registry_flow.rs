//! Registry flows driven through the scripted engine.

use objcli::{
    AttrValue, CliError, ConfigError, Context, ContextState, EngineErrorKind, Field, Layer,
    MockEngine, Opts, Registry, ValueError, ValueType,
};

fn registry() -> Registry<MockEngine> {
    Registry::new(MockEngine::new())
}

/// `create`/`update` actions and a `repo` object keyed by `instance`, with a
/// `repos` list mapping `#w(:#w)?` groups 1 and 3.
fn repo_registry() -> Registry<MockEngine> {
    let mut reg = registry();
    reg.new_action("create", "Create things", "Create {object}", false)
        .expect("create");
    reg.new_action("update", "Update things", "Update {object}", false)
        .expect("update");

    let mut repo = reg.new_object("repo", "a repository").expect("repo");
    repo.add_key(Field::string("instance", "Repository instance"))
        .expect("key")
        .add_field(Field::string("name", "Repository name"))
        .expect("name")
        .define_actions(&["create", "update"])
        .expect("define")
        .on_actions(&[])
        .expect("select")
        .add_flag("instance", Opts::new())
        .expect("instance flag")
        .add_flag("name", Opts::new())
        .expect("name flag");
    repo.create_list("repos", ',', "#w(:#w)?", "repositories")
        .expect("list")
        .field(1, "instance")
        .expect("group 1")
        .field(3, "name")
        .expect("group 3")
        .add_actions(&["create"])
        .expect("create repos");
    reg.check().expect("clean model");
    reg
}

fn no_args() -> Vec<String> {
    Vec::new()
}

// ============================================
// Values
// ============================================

mod values {
    use super::*;

    #[test]
    fn app_flag_on_bare_action() {
        let mut reg = registry();
        reg.new_action("update", "Update", "Update {object}", false)
            .expect("update");
        reg.add_app_flag("test", ValueType::String, "test flag", Opts::new())
            .expect("app flag");
        reg.engine_mut()
            .set_context(&["update"])
            .set_app_value("test", "test value");

        let outcome = reg.parse(&no_args()).expect("parse");
        assert_eq!(outcome.context, Context::action_only("update"));
        assert_eq!(
            reg.get_app_string_value("test"),
            Some("test value".to_string())
        );
        let value = reg.get_app_value("test").expect("value");
        assert!(!value.is_default);
        assert!(reg.is_app_flag_found("test"));
    }

    #[test]
    fn object_action_flag_is_stored_under_key() {
        let mut reg = registry();
        reg.new_action("update", "Update", "Update {object}", false)
            .expect("update");
        reg.new_object("test", "a test object")
            .expect("test")
            .add_key(Field::string("key", "Key"))
            .expect("key")
            .add_field(Field::string("flag", "Flag"))
            .expect("flag")
            .define_actions(&["update"])
            .expect("define")
            .on_actions(&[])
            .expect("select")
            .add_flag("key", Opts::new())
            .expect("key flag")
            .add_flag("flag", Opts::new())
            .expect("flag flag");
        reg.engine_mut()
            .set_context(&["update", "test"])
            .set_context_value("key", "key-value")
            .set_context_value("flag", "flag value");

        let outcome = reg.parse(&no_args()).expect("parse");
        assert_eq!(outcome.command, "update test");
        assert_eq!(
            reg.get_string_value("test", "key-value", "flag"),
            Ok(Some("flag value".to_string()))
        );
        assert_eq!(
            reg.get_string_value("test", "key-value", "action"),
            Ok(Some("update".to_string()))
        );
        assert_eq!(reg.get_string_value("test", "other", "flag"), Ok(None));
        assert!(matches!(
            reg.get_string_value("missing", "key-value", "flag"),
            Err(ConfigError::UnknownObject(_))
        ));
    }

    #[test]
    fn nothing_is_stored_without_key_value() {
        let mut reg = repo_registry();
        reg.engine_mut()
            .set_context(&["create", "repo"])
            .set_context_value("name", "web");
        reg.parse(&no_args()).expect("parse");
        assert!(reg.values().is_empty());
    }

    #[test]
    fn bool_fields_read_as_bool() {
        let mut reg = repo_registry();
        reg.object("repo")
            .expect("repo")
            .add_field(Field::bool("private", "Private repository"))
            .expect("field")
            .on_actions(&["create"])
            .expect("select")
            .add_flag("private", Opts::new())
            .expect("flag");

        reg.engine_mut()
            .set_context(&["create", "repo"])
            .set_context_value("instance", "web");
        reg.parse(&no_args()).expect("parse");
        assert_eq!(reg.get_bool_value("repo", "web", "private"), Ok(Some(false)));
        let stored = reg.get_value("repo", "web", "private").expect("object");
        assert!(stored.is_some_and(|v| v.is_default));

        reg.engine_mut().set_context_value("private", "true");
        reg.parse(&no_args()).expect("parse again");
        assert_eq!(reg.get_bool_value("repo", "web", "private"), Ok(Some(true)));
    }

    #[test]
    fn repeated_parses_merge_records() {
        let mut reg = repo_registry();
        reg.engine_mut()
            .set_context(&["create", "repo"])
            .set_context_value("instance", "web")
            .set_context_value("name", "Website");
        reg.parse(&no_args()).expect("first");

        reg.engine_mut().clear();
        reg.engine_mut()
            .set_context(&["update", "repo"])
            .set_context_value("instance", "web");
        let outcome = reg.parse(&no_args()).expect("second");
        assert_eq!(outcome.context, Context::action_object("update", "repo"));

        assert_eq!(
            reg.get_string_value("repo", "web", "name"),
            Ok(Some("Website".to_string()))
        );
        assert_eq!(
            reg.get_string_value("repo", "web", "action"),
            Ok(Some("update".to_string()))
        );
    }

    #[test]
    fn action_level_copies_store_under_origin_object() {
        let mut reg = repo_registry();
        reg.add_action_flag_from_object_action("create", "repo", "create", "instance", Some("repo"))
            .expect("copy key");
        reg.add_action_flag_from_object_action("create", "repo", "create", "name", Some("repo-name"))
            .expect("copy name");
        reg.engine_mut()
            .set_context(&["create"])
            .set_context_value("repo", "api")
            .set_context_value("repo-name", "API");

        let outcome = reg.parse(&no_args()).expect("parse");
        assert_eq!(outcome.context.state(), ContextState::ActionOnly);
        let stored = reg.values().get("repo", "api", "name").expect("stored");
        assert_eq!(stored.value, "API");
        assert_eq!(stored.layer, Layer::Action);
    }
}

// ============================================
// Context resolution and layering
// ============================================

mod resolution {
    use super::*;

    #[test]
    fn plural_list_command_sets_list_and_object() {
        let mut reg = repo_registry();
        reg.engine_mut().set_context(&["create", "repos"]);
        let ctx = reg.resolve_context(&no_args()).expect("resolve");
        assert_eq!(ctx.list(), Some("repos"));
        assert_eq!(ctx.object(), Some("repo"));
        assert_eq!(ctx.action(), Some("create"));
    }

    #[test]
    fn unmatched_chain_is_empty_context() {
        let mut reg = repo_registry();
        reg.engine_mut().set_context(&[]);
        let ctx = reg.resolve_context(&no_args()).expect("resolve");
        assert_eq!(ctx.state(), ContextState::NoContext);
    }

    /// `create repo` gets a defaulted `title` flag; the bare `create` action
    /// carries copies of `instance` (as `repo`) and `title` (as `repo-title`).
    fn layered_registry() -> Registry<MockEngine> {
        let mut reg = repo_registry();
        reg.object("repo")
            .expect("repo")
            .add_field(Field::string("title", "Title"))
            .expect("title")
            .on_actions(&["create"])
            .expect("select")
            .add_flag("title", Opts::new().default_value("untitled"))
            .expect("title flag");
        reg.add_action_flag_from_object_action(
            "create",
            "repo",
            "create",
            "instance",
            Some("repo"),
        )
        .expect("repo copy");
        reg.add_action_flag_from_object_action(
            "create",
            "repo",
            "create",
            "title",
            Some("repo-title"),
        )
        .expect("title copy");
        reg.add_app_flag(
            "owner",
            ValueType::String,
            "default owner",
            Opts::new().default_value("fallback"),
        )
        .expect("app flag");
        reg.check().expect("clean model");
        reg
    }

    fn lookup(
        reg: &Registry<MockEngine>,
        ctx: &Context,
        key: &str,
        param: &str,
    ) -> Option<(Layer, String)> {
        reg.get_context_value(ctx, "repo", key, param)
            .expect("object")
            .map(|(layer, v)| (layer, v.value))
    }

    #[test]
    fn layered_lookup_prefers_explicit_values() {
        let mut reg = layered_registry();
        reg.engine_mut()
            .set_context(&["create", "repo"])
            .set_context_value("instance", "web")
            .set_context_value("repo", "web");
        let ctx = reg.resolve_context(&no_args()).expect("resolve");
        assert_eq!(
            lookup(&reg, &ctx, "web", "title"),
            Some((Layer::ObjectAction, "untitled".to_string()))
        );
        assert_eq!(
            lookup(&reg, &ctx, "web", "owner"),
            Some((Layer::Application, "fallback".to_string()))
        );

        reg.engine_mut().set_context_value("repo-title", "Site");
        let ctx = reg.resolve_context(&no_args()).expect("resolve");
        assert_eq!(
            lookup(&reg, &ctx, "web", "title"),
            Some((Layer::Action, "Site".to_string()))
        );

        reg.engine_mut().set_context_value("title", "Website");
        let ctx = reg.resolve_context(&no_args()).expect("resolve");
        assert_eq!(
            lookup(&reg, &ctx, "web", "title"),
            Some((Layer::ObjectAction, "Website".to_string()))
        );
    }

    #[test]
    fn layered_lookup_only_answers_for_the_loaded_key() {
        let mut reg = layered_registry();
        reg.engine_mut()
            .set_context(&["create", "repo"])
            .set_context_value("instance", "web")
            .set_context_value("repo", "web")
            .set_context_value("title", "Website");
        let ctx = reg.resolve_context(&no_args()).expect("resolve");

        assert_eq!(
            lookup(&reg, &ctx, "web", "title"),
            Some((Layer::ObjectAction, "Website".to_string()))
        );
        assert_eq!(lookup(&reg, &ctx, "api", "title"), None);
        assert_eq!(
            lookup(&reg, &ctx, "api", "owner"),
            Some((Layer::Application, "fallback".to_string()))
        );

        // Only the action copy holds `api`.
        reg.engine_mut().set_context_value("repo", "api");
        let ctx = reg.resolve_context(&no_args()).expect("resolve");
        assert_eq!(
            lookup(&reg, &ctx, "api", "title"),
            Some((Layer::Action, "untitled".to_string()))
        );
        assert_eq!(
            lookup(&reg, &ctx, "web", "title"),
            Some((Layer::ObjectAction, "Website".to_string()))
        );
    }

    #[test]
    fn list_context_only_sees_application_layer() {
        let mut reg = repo_registry();
        reg.engine_mut()
            .set_context(&["create", "repos"])
            .set_context_value("name", "ignored");
        let ctx = reg.resolve_context(&no_args()).expect("resolve");
        assert_eq!(reg.get_context_value(&ctx, "repo", "web", "name"), Ok(None));
        assert!(reg.get_context_value(&ctx, "nope", "web", "name").is_err());
    }

    #[test]
    fn stored_values_answer_context_lookups() {
        let mut reg = repo_registry();
        reg.engine_mut()
            .set_context(&["create", "repo"])
            .set_context_value("instance", "web")
            .set_context_value("name", "Website");
        let outcome = reg.parse(&no_args()).expect("parse");

        let found = reg
            .get_context_value(&Context::default(), "repo", "web", "name")
            .expect("object");
        assert_eq!(
            found.map(|(layer, v)| (layer, v.value)),
            Some((Layer::ObjectAction, "Website".to_string()))
        );
        assert!(
            reg.get_context_value(&outcome.context, "repo", "web", "instance")
                .expect("object")
                .is_some()
        );
    }
}

// ============================================
// Lists
// ============================================

mod lists {
    use super::*;

    #[test]
    fn list_records_are_stored_per_key() {
        let mut reg = repo_registry();
        reg.engine_mut()
            .set_context(&["create", "repos"])
            .set_context_values("repos", &["myinstance:myname,otherinstance"]);

        let outcome = reg.parse(&no_args()).expect("parse");
        assert_eq!(outcome.context.state(), ContextState::ActionObjectList);
        assert_eq!(reg.values().keys("repo"), vec!["myinstance", "otherinstance"]);
        assert_eq!(
            reg.get_string_value("repo", "myinstance", "name"),
            Ok(Some("myname".to_string()))
        );
        assert_eq!(reg.get_string_value("repo", "otherinstance", "name"), Ok(None));
        let layer = reg
            .values()
            .get("repo", "otherinstance", "action")
            .map(|a| a.layer);
        assert_eq!(layer, Some(Layer::ObjectList));
    }

    #[test]
    fn every_occurrence_feeds_the_list() {
        let mut reg = repo_registry();
        reg.engine_mut()
            .set_context(&["create", "repos"])
            .set_context_values("repos", &["a,b", "c:C"]);
        reg.parse(&no_args()).expect("parse");
        assert_eq!(reg.values().keys("repo"), vec!["a", "b", "c"]);
    }

    #[test]
    fn bad_segment_is_reported_after_good_occurrences_load() {
        let mut reg = repo_registry();
        reg.engine_mut()
            .set_context(&["create", "repos"])
            .set_context_values("repos", &["good", "bad value"]);

        let err = reg.parse(&no_args()).expect_err("mismatch");
        assert!(matches!(
            err,
            CliError::Value(ValueError::SegmentMismatch { position: 1, .. })
        ));
        assert_eq!(reg.values().keys("repo"), vec!["good"]);
    }

    #[test]
    fn validation_hook_rejects_records() {
        let mut reg = repo_registry();
        reg.object("repo")
            .expect("repo")
            .list("repos")
            .expect("repos")
            .validate_with(|record| match record.get("instance") {
                Some("root") => Err("reserved".to_string()),
                _ => Ok(()),
            });
        reg.engine_mut()
            .set_context(&["create", "repos"])
            .set_context_values("repos", &["web,root"]);

        let err = reg.parse(&no_args()).expect_err("rejected");
        assert!(matches!(
            err,
            CliError::Value(ValueError::RecordRejected { position: 2, .. })
        ));
        assert!(reg.values().is_empty());
    }

    #[test]
    fn list_flag_on_bare_action() {
        let mut reg = repo_registry();
        reg.add_action_flag_from_object_list("create", "repo", "repos")
            .expect("list flag");

        reg.engine_mut()
            .set_context(&["create"])
            .set_context_values("repos", &["web:Website"]);
        reg.parse(&no_args()).expect("parse");
        assert_eq!(
            reg.get_string_value("repo", "web", "name"),
            Ok(Some("Website".to_string()))
        );
    }

    #[test]
    fn list_flag_needs_a_related_action() {
        let mut reg = repo_registry();
        reg.new_action("delete", "Delete things", "Delete {object}", false)
            .expect("delete");
        assert!(matches!(
            reg.add_action_flag_from_object_list("delete", "repo", "repos"),
            Err(ConfigError::ActionNotAccepted { ref action, .. }) if action == "delete"
        ));
        assert!(matches!(
            reg.add_action_flag_from_object_list("archive", "repo", "repos"),
            Err(ConfigError::UnknownAction(ref name)) if name == "archive"
        ));
        assert_eq!(reg.errors().len(), 2);
        assert!(reg.get_action("delete").is_some_and(|a| a.param("repos").is_none()));
    }

    #[test]
    fn field_formats_are_enforced() {
        let mut reg = repo_registry();
        reg.object("repo")
            .expect("repo")
            .add_field(Field::string("owner", "Owner").with_format("[a-z]+"))
            .expect("owner")
            .on_actions(&["create"])
            .expect("select")
            .add_flag("owner", Opts::new())
            .expect("flag");
        reg.engine_mut()
            .set_context(&["create", "repo"])
            .set_context_value("instance", "web")
            .set_context_value("owner", "Bad Owner");

        let err = reg.parse(&no_args()).expect_err("format");
        assert!(matches!(
            err,
            CliError::Value(ValueError::FieldFormat { ref field, .. }) if field == "owner"
        ));
        assert!(reg.values().record("repo", "web").is_none());
    }
}

// ============================================
// Configuration errors
// ============================================

mod configuration {
    use super::*;

    #[test]
    fn pending_errors_block_parse() {
        let mut reg = registry();
        reg.new_action("create", "Create", "Create {object}", false)
            .expect("create");
        let _ = reg
            .new_object("repo", "a repository")
            .expect("repo")
            .define_actions(&["create"]);

        let err = reg.parse(&no_args()).expect_err("blocked");
        match err {
            CliError::Configuration(errors) => {
                assert!(matches!(errors.as_slice(), [ConfigError::MissingKey { .. }]));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn incompatible_list_fields_invalidate_the_list() {
        let mut reg = registry();
        reg.new_action("create", "Create", "Create {object}", false)
            .expect("create");
        reg.new_action("update", "Update", "Update {object}", false)
            .expect("update");
        let mut repo = reg.new_object("repo", "a repository").expect("repo");
        repo.add_key(Field::string("instance", ""))
            .expect("key")
            .add_field(Field::string("name", ""))
            .expect("name")
            .define_actions(&["create", "update"])
            .expect("define")
            .on_actions(&["create"])
            .expect("create only")
            .add_flag("instance", Opts::new())
            .expect("instance")
            .on_actions(&["update"])
            .expect("update only")
            .add_flag("name", Opts::new())
            .expect("name");

        let mut list = repo.create_list("repos", ',', "#w:#w", "").expect("list");
        list.field(1, "instance").expect("instance");
        assert!(matches!(
            list.field(2, "name"),
            Err(ConfigError::NoCommonAction { .. })
        ));
        assert!(matches!(
            list.add_actions(&["create"]),
            Err(ConfigError::InvalidList { .. })
        ));
        assert_eq!(reg.errors().len(), 2);
    }

    #[test]
    fn app_flag_rejects_names_used_by_commands() {
        let mut reg = repo_registry();
        for name in ["name", "instance", "repos"] {
            assert!(matches!(
                reg.add_app_flag(name, ValueType::String, "", Opts::new()),
                Err(ConfigError::DuplicateParam { ref owner, ref param })
                    if owner == "application" && param == name
            ));
        }
        assert!(reg.app_flag("name").is_none());
        assert_eq!(reg.errors().len(), 3);
    }

    #[test]
    fn commands_reject_names_of_app_flags() {
        let mut reg = registry();
        reg.add_app_flag("verbose", ValueType::Bool, "Chatty", Opts::new())
            .expect("verbose");
        reg.new_action("create", "Create", "Create {object}", false)
            .expect("create");
        reg.new_action("update", "Update", "Update {object}", false)
            .expect("update");
        let mut repo = reg.new_object("repo", "a repository").expect("repo");
        repo.add_key(Field::string("instance", ""))
            .expect("key")
            .add_field(Field::bool("verbose", ""))
            .expect("field")
            .define_actions(&["create", "update"])
            .expect("define")
            .on_actions(&[])
            .expect("select")
            .add_flag("instance", Opts::new())
            .expect("instance");
        assert!(matches!(
            repo.add_flag("verbose", Opts::new()).err(),
            Some(ConfigError::DuplicateParam { .. })
        ));
        let mut list = repo.create_list("verbose", ',', "#w", "").expect("list");
        list.field(1, "instance").expect("group 1");
        assert!(matches!(
            list.add_actions(&["create"]).err(),
            Some(ConfigError::DuplicateParam { .. })
        ));
        assert!(matches!(
            reg.action("create")
                .expect("create")
                .add_flag("verbose", ValueType::Bool, "", Opts::new())
                .err(),
            Some(ConfigError::DuplicateParam { .. })
        ));
        assert!(matches!(
            reg.add_action_flag_from_object_action(
                "update",
                "repo",
                "create",
                "instance",
                Some("verbose")
            ),
            Err(ConfigError::DuplicateParam { .. })
        ));
        assert!(matches!(
            reg.add_action_flag_from_object_list("create", "repo", "verbose"),
            Err(ConfigError::DuplicateParam { .. })
        ));
        assert_eq!(reg.errors().len(), 5);
        let repo = reg.get_object("repo").expect("repo");
        assert!(repo.action("create").is_some_and(|oa| !oa.has_param("verbose")));
    }

    #[test]
    fn required_flags_are_enforced_by_parse_only() {
        let mut reg = repo_registry();
        reg.action("create")
            .expect("create")
            .add_flag("owner", ValueType::String, "Owner", Opts::new().required())
            .expect("required flag");
        reg.engine_mut().set_context(&["create"]);

        assert!(reg.resolve_context(&no_args()).is_ok());
        let err = reg.parse(&no_args()).expect_err("missing");
        assert!(matches!(
            err,
            CliError::Engine {
                kind: EngineErrorKind::Usage,
                ..
            }
        ));
    }
}

// ============================================
// Hooks
// ============================================

mod hooks {
    use super::*;

    #[test]
    fn refresh_hook_declares_objects_late() {
        let mut reg = repo_registry();
        reg.on_context_refresh("create", "plugin", |reg, ctx| {
            assert_eq!(ctx.action(), Some("create"));
            reg.new_object("plugin", "a plugin")?
                .add_key(Field::string("name", "Plugin name"))?
                .define_actions(&["create"])?
                .on_actions(&[])?
                .add_flag("name", Opts::new())?;
            Ok(())
        })
        .expect("hook");

        reg.engine_mut()
            .set_context(&["create", "plugin"])
            .set_context_value("name", "lint");
        let outcome = reg.parse(&no_args()).expect("parse");
        assert_eq!(outcome.context, Context::action_object("create", "plugin"));
        assert_eq!(
            reg.get_string_value("plugin", "lint", "name"),
            Ok(Some("lint".to_string()))
        );
    }

    #[test]
    fn late_binding_cannot_use_internal_actions() {
        let mut reg = repo_registry();
        reg.new_action("maintain", "Maintain", "Maintain {object}", true)
            .expect("maintain");
        reg.on_context_refresh("create", "plugin", |reg, _| {
            reg.new_object("plugin", "a plugin")?
                .add_key(Field::string("name", ""))?
                .define_actions(&["maintain"])?;
            Ok(())
        })
        .expect("hook");

        reg.engine_mut().set_context(&["create"]);
        let err = reg.parse(&no_args()).expect_err("internal");
        assert!(matches!(
            err,
            CliError::Config(ConfigError::InternalAction { .. })
        ));
    }

    #[test]
    fn late_binding_cannot_extend_internal_objects() {
        let mut reg = repo_registry();
        reg.new_internal_object("core", "core settings")
            .expect("core")
            .add_key(Field::string("name", ""))
            .expect("key");
        reg.on_context_refresh("update", "core", |reg, _| {
            reg.object("core")?.add_field(Field::string("extra", ""))?;
            Ok(())
        })
        .expect("hook");

        reg.engine_mut().set_context(&["update"]);
        let err = reg.parse(&no_args()).expect_err("internal object");
        assert!(matches!(
            err,
            CliError::Config(ConfigError::InternalObject(ref name)) if name == "core"
        ));

        // Outside of a refresh the same call is allowed.
        assert!(reg.object("core").is_ok());
    }

    #[test]
    fn parse_hook_can_enrich_records() {
        let mut reg = repo_registry();
        reg.on_object_parsed("repo", |object, ctx, store| {
            let keys: Vec<String> = store.keys(object).into_iter().map(String::from).collect();
            for key in keys {
                let source = ctx.action().unwrap_or_default().to_string();
                store.set(object, &key, "source", AttrValue::new(source, false, Layer::ObjectAction));
            }
            Ok(())
        })
        .expect("hook");

        reg.engine_mut()
            .set_context(&["create", "repo"])
            .set_context_value("instance", "web");
        reg.parse(&no_args()).expect("parse");
        assert_eq!(
            reg.get_string_value("repo", "web", "source"),
            Ok(Some("create".to_string()))
        );
    }

    #[test]
    fn hook_errors_abort_parse() {
        let mut reg = repo_registry();
        reg.on_object_parsed("repo", |_, _, _| Err(CliError::Hook("denied".to_string())))
            .expect("hook");
        reg.engine_mut().set_context(&["create"]);
        assert_eq!(
            reg.parse(&no_args()),
            Err(CliError::Hook("denied".to_string()))
        );
    }
}
