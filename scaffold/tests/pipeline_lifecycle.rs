//! Runner-level tests for whole pipelines against a real target directory.
//!
//! Commands, checkpoints and templates are recorded fakes, so these cover the
//! step state machine: skip, apply, halt, and resume.

use std::fs;
use std::path::{Path, PathBuf};

use scaffold::core::anchor::Anchor;
use scaffold::core::guard::{Guard, Options};
use scaffold::core::types::{Mutation, Pipeline};
use scaffold::error::ScaffoldError;
use scaffold::io::pipeline_file::{load_pipeline, templates_dir};
use scaffold::io::run_state::{RunState, load_run_state};
use scaffold::io::templates::DirTemplates;
use scaffold::io::workspace::Workspace;
use scaffold::pipeline::{Collaborators, PipelineRunner, RunReport, SkipReason, StepStatus};
use scaffold::test_support::{
    MemoryTemplates, RecordingCheckpoint, RecordingCommands, TestTree, insert_after,
    insert_before, pipeline, step, write_new,
};
use serde_json::json;

const GEMFILE: &str = "source 'https://rubygems.org'\n\ngroup :development, :test do\nend\n";

fn run_pipeline(
    tree: &TestTree,
    pipeline: &Pipeline,
    state: &mut RunState,
    options: &Options,
    hooks: Collaborators<'_>,
) -> Result<RunReport, ScaffoldError> {
    let mut runner = PipelineRunner::new(Workspace::new(tree.path(), false), options, hooks);
    runner.run(pipeline, state)
}

/// rspec, a test group before the dev group, then capybara into that test group.
fn test_stack() -> Pipeline {
    let mut rspec = step(
        "Add rspec",
        vec![insert_after(
            "Gemfile",
            "group :development, :test do\n",
            "  gem 'rspec-rails', '~> 6.0'\n",
        )],
    );
    rspec.commands = vec!["bundle install".to_string()];
    let group = step(
        "Add test gem group",
        vec![insert_before(
            "Gemfile",
            "group :development, :test do\n",
            "group :test do\nend\n\n",
        )],
    );
    let mut capybara = step(
        "Add capybara",
        vec![
            insert_after("Gemfile", "group :test do\n", "  gem 'capybara', '~> 3.39'\n"),
            write_new("spec/support/capybara.rb", "require 'capybara/rspec'\n"),
        ],
    );
    capybara.commands = vec!["bundle install".to_string()];
    pipeline("rails", vec![rspec, group, capybara])
}

#[test]
fn rspec_insert_lands_after_anchor_and_rerun_is_unchanged() {
    let tree = TestTree::new().expect("tree");
    tree.write("Gemfile", "group :development, :test do\nend\n")
        .expect("gemfile");
    let commands = RecordingCommands::new();
    let checkpoint = RecordingCheckpoint::new();
    let templates = MemoryTemplates::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let rspec = pipeline(
        "rails",
        vec![step(
            "Add rspec",
            vec![insert_after(
                "Gemfile",
                "group :development, :test do\n",
                "  gem 'rspec-rails', '~> 6.0'\n",
            )],
        )],
    );
    let options = Options::new();

    let mut state = RunState::new("rails", tree.path());
    run_pipeline(&tree, &rspec, &mut state, &options, hooks).expect("first run");
    assert_eq!(
        tree.read("Gemfile").expect("read"),
        "group :development, :test do\n  gem 'rspec-rails', '~> 6.0'\nend\n"
    );

    // Fresh state: the step runs again but every mutation is a no-op.
    let mut fresh = RunState::new("rails", tree.path());
    let report = run_pipeline(&tree, &rspec, &mut fresh, &options, hooks).expect("second run");
    assert_eq!(
        report.status("Add rspec"),
        Some(&StepStatus::Applied {
            files: Vec::new(),
            commands: 0,
        })
    );
    assert_eq!(
        tree.read("Gemfile").expect("read"),
        "group :development, :test do\n  gem 'rspec-rails', '~> 6.0'\nend\n"
    );
    assert_eq!(checkpoint.commits(), vec!["Add rspec", "Add rspec"]);
}

#[test]
fn completed_steps_are_skipped_and_checkpointed_once() {
    let tree = TestTree::new().expect("tree");
    tree.write("Gemfile", GEMFILE).expect("gemfile");
    let commands = RecordingCommands::new();
    let checkpoint = RecordingCheckpoint::new();
    let templates = MemoryTemplates::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let options = Options::new();
    let stack = test_stack();

    let mut state = RunState::new("rails", tree.path());
    run_pipeline(&tree, &stack, &mut state, &options, hooks).expect("first run");
    let after_first = tree.snapshot().expect("snapshot");

    let report = run_pipeline(&tree, &stack, &mut state, &options, hooks).expect("second run");
    assert!(
        report
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Skipped(SkipReason::Completed))
    );
    assert_eq!(tree.snapshot().expect("snapshot"), after_first);
    assert_eq!(
        checkpoint.commits(),
        vec!["Add rspec", "Add test gem group", "Add capybara"]
    );
    assert_eq!(commands.calls(), vec!["bundle install", "bundle install"]);
}

#[test]
fn resumed_run_matches_uninterrupted_run() {
    let options = Options::new();
    let templates = MemoryTemplates::new();

    let full = TestTree::new().expect("tree");
    full.write("Gemfile", GEMFILE).expect("gemfile");
    {
        let commands = RecordingCommands::new();
        let checkpoint = RecordingCheckpoint::new();
        let hooks = Collaborators {
            commands: &commands,
            checkpoint: &checkpoint,
            templates: &templates,
        };
        let mut state = RunState::new("rails", full.path());
        run_pipeline(&full, &test_stack(), &mut state, &options, hooks).expect("full run");
    }

    let resumed = TestTree::new().expect("tree");
    resumed.write("Gemfile", GEMFILE).expect("gemfile");
    let mut state = RunState::new("rails", resumed.path());

    // The third step's install fails.
    let mut capybara_fails = test_stack();
    capybara_fails.steps[2].commands = vec!["bundle install --capybara".to_string()];
    let failing = RecordingCommands::new().fail_with("bundle install --capybara", 5);
    let checkpoint = RecordingCheckpoint::new();
    let hooks = Collaborators {
        commands: &failing,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let err = run_pipeline(&resumed, &capybara_fails, &mut state, &options, hooks)
        .expect_err("command failure");
    match &err {
        ScaffoldError::ExternalCommandFailed { step, code, .. } => {
            assert_eq!(step, "Add capybara");
            assert_eq!(*code, Some(5));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(state.completed_steps, vec!["Add rspec", "Add test gem group"]);
    assert!(!resumed.exists("spec/support/capybara.rb"));
    assert!(
        !resumed
            .read("Gemfile")
            .expect("read")
            .contains("capybara")
    );

    let commands = RecordingCommands::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let report =
        run_pipeline(&resumed, &test_stack(), &mut state, &options, hooks).expect("resume");
    assert_eq!(
        report.status("Add rspec"),
        Some(&StepStatus::Skipped(SkipReason::Completed))
    );
    assert_eq!(commands.calls(), vec!["bundle install"]);
    assert_eq!(
        resumed.snapshot().expect("snapshot"),
        full.snapshot().expect("snapshot")
    );
    assert_eq!(
        checkpoint.commits(),
        vec!["Add rspec", "Add test gem group", "Add capybara"]
    );
}

#[test]
fn failing_second_mutation_leaves_no_step_files_on_disk() {
    let tree = TestTree::new().expect("tree");
    tree.write("Gemfile", GEMFILE).expect("gemfile");
    tree.write("spec/rails_helper.rb", "require 'rails_helper'\n")
        .expect("helper");
    let before = tree.snapshot().expect("snapshot");

    let commands = RecordingCommands::new();
    let checkpoint = RecordingCheckpoint::new();
    let templates = MemoryTemplates::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let mut factory_bot = step(
        "Add factory_bot_rails",
        vec![
            insert_after(
                "Gemfile",
                "group :development, :test do\n",
                "  gem 'factory_bot_rails'\n",
            ),
            write_new("spec/support/factory_bot.rb", "FactoryBot\n"),
            insert_after(
                "spec/rails_helper.rb",
                "require 'spec_helper'\n",
                "require 'support/factory_bot'\n",
            ),
        ],
    );
    factory_bot.commands = vec!["bundle install".to_string()];
    let options = Options::new();
    let mut state = RunState::new("rails", tree.path());

    let err = run_pipeline(
        &tree,
        &pipeline("rails", vec![factory_bot]),
        &mut state,
        &options,
        hooks,
    )
    .expect_err("missing anchor");

    match &err {
        ScaffoldError::AnchorNotFound { step, file, anchor } => {
            assert_eq!(step, "Add factory_bot_rails");
            assert_eq!(file, &PathBuf::from("spec/rails_helper.rb"));
            assert!(anchor.contains("require 'spec_helper'"), "{anchor}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(tree.snapshot().expect("snapshot"), before);
    assert!(commands.calls().is_empty());
    assert!(checkpoint.commits().is_empty());
    assert!(state.completed_steps.is_empty());
}

#[test]
fn failed_step_halts_the_pipeline() {
    let tree = TestTree::new().expect("tree");
    tree.write("Gemfile", GEMFILE).expect("gemfile");
    let commands = RecordingCommands::new();
    let checkpoint = RecordingCheckpoint::new();
    let templates = MemoryTemplates::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let options = Options::new();
    let mut state = RunState::new("rails", tree.path());

    let mut stack = test_stack();
    // Without the test group step, capybara has nothing to anchor on.
    stack.steps.remove(1);
    stack.steps.push(step("Later", vec![write_new("LATER", "x\n")]));

    let err = run_pipeline(&tree, &stack, &mut state, &options, hooks).expect_err("halt");
    assert_eq!(err.step(), Some("Add capybara"));
    assert!(!tree.exists("LATER"));
    assert_eq!(checkpoint.commits(), vec!["Add rspec"]);
}

#[test]
fn checkpoint_failure_keeps_step_out_of_run_state() {
    let tree = TestTree::new().expect("tree");
    tree.write("Gemfile", GEMFILE).expect("gemfile");
    let commands = RecordingCommands::new();
    let failing = RecordingCheckpoint::failing_on("Add rspec");
    let templates = MemoryTemplates::new();
    let options = Options::new();
    let stack = pipeline("rails", vec![test_stack().steps.remove(0)]);
    let mut state = RunState::new("rails", tree.path());

    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &failing,
        templates: &templates,
    };
    let err = run_pipeline(&tree, &stack, &mut state, &options, hooks).expect_err("checkpoint");
    assert!(
        matches!(err, ScaffoldError::CheckpointFailed { ref step, .. } if step == "Add rspec"),
        "{err}"
    );
    assert!(state.completed_steps.is_empty());
    let applied = tree.read("Gemfile").expect("read");
    assert!(applied.contains("rspec-rails"));

    // Re-running redoes the step without duplicating its edit.
    let checkpoint = RecordingCheckpoint::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    run_pipeline(&tree, &stack, &mut state, &options, hooks).expect("rerun");
    assert_eq!(tree.read("Gemfile").expect("read"), applied);
    assert_eq!(checkpoint.commits(), vec!["Add rspec"]);
    assert_eq!(state.completed_steps, vec!["Add rspec"]);
}

#[test]
fn guards_select_steps_from_options() {
    let commands = RecordingCommands::new();
    let checkpoint = RecordingCheckpoint::new();
    let templates = MemoryTemplates::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let mut api_only = step("Api only", vec![write_new("API", "yes\n")]);
    api_only.guard = Some(Guard::Enabled("api".to_string()));
    let mut postgres = step("Postgres", vec![write_new("DB", "pg\n")]);
    postgres.guard = Some(Guard::Equals {
        key: "database".to_string(),
        value: json!("postgresql"),
    });
    let guarded = pipeline("guarded", vec![api_only, postgres]);

    let plain = TestTree::new().expect("tree");
    let mut state = RunState::new("guarded", plain.path());
    let report =
        run_pipeline(&plain, &guarded, &mut state, &Options::new(), hooks).expect("plain run");
    assert_eq!(
        report.status("Api only"),
        Some(&StepStatus::Skipped(SkipReason::Guard))
    );
    assert!(!plain.exists("API"));
    assert!(state.completed_steps.is_empty());

    let api = TestTree::new().expect("tree");
    let mut options = Options::new();
    options.insert("api".to_string(), json!(true));
    options.insert("database".to_string(), json!("postgresql"));
    let mut state = RunState::new("guarded", api.path());
    run_pipeline(&api, &guarded, &mut state, &options, hooks).expect("api run");
    assert_eq!(api.read("API").expect("read"), "yes\n");
    assert_eq!(api.read("DB").expect("read"), "pg\n");
    assert_eq!(checkpoint.commits(), vec!["Api only", "Postgres"]);
}

#[test]
fn dry_run_plans_every_step_without_side_effects() {
    let tree = TestTree::new().expect("tree");
    tree.write("Gemfile", GEMFILE).expect("gemfile");
    let before = tree.snapshot().expect("snapshot");
    let commands = RecordingCommands::new();
    let checkpoint = RecordingCheckpoint::new();
    let templates = MemoryTemplates::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let options = Options::new();
    let mut state = RunState::new("rails", tree.path());

    let mut runner = PipelineRunner::new(Workspace::new(tree.path(), true), &options, hooks);
    let report = runner.run(&test_stack(), &mut state).expect("dry run");

    // Capybara anchors on the group inserted by the previous planned step.
    assert_eq!(
        report.status("Add capybara"),
        Some(&StepStatus::Planned {
            files: vec![
                PathBuf::from("Gemfile"),
                PathBuf::from("spec/support/capybara.rb"),
            ],
        })
    );
    assert_eq!(tree.snapshot().expect("snapshot"), before);
    assert!(commands.calls().is_empty());
    assert!(checkpoint.commits().is_empty());
    assert!(state.completed_steps.is_empty());
}

#[test]
fn write_new_conflict_leaves_existing_file_untouched() {
    let tree = TestTree::new().expect("tree");
    tree.write(".rubocop.yml", "AllCops:\n  NewCops: disable\n")
        .expect("config");
    let commands = RecordingCommands::new();
    let checkpoint = RecordingCheckpoint::new();
    let templates =
        MemoryTemplates::new().with(".rubocop.yml", "AllCops:\n  NewCops: enable\n");
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let rubocop = pipeline(
        "rails",
        vec![step(
            "Add rubocop",
            vec![Mutation::CopyTemplate {
                template: ".rubocop.yml".to_string(),
                dest: None,
                render: false,
            }],
        )],
    );
    let mut state = RunState::new("rails", tree.path());

    let err = run_pipeline(&tree, &rubocop, &mut state, &Options::new(), hooks)
        .expect_err("conflict");
    match &err {
        ScaffoldError::WriteConflict { step, path } => {
            assert_eq!(step, "Add rubocop");
            assert_eq!(path, &PathBuf::from(".rubocop.yml"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        tree.read(".rubocop.yml").expect("read"),
        "AllCops:\n  NewCops: disable\n"
    );
}

#[test]
fn literal_anchor_always_uses_first_match() {
    let content = "group :test do\nend\n\ngroup :test do\nend\n";
    let commands = RecordingCommands::new();
    let checkpoint = RecordingCheckpoint::new();
    let templates = MemoryTemplates::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let capybara = pipeline(
        "rails",
        vec![step(
            "Add capybara",
            vec![insert_after(
                "Gemfile",
                "group :test do\n",
                "  gem 'capybara'\n",
            )],
        )],
    );

    for _ in 0..3 {
        let tree = TestTree::new().expect("tree");
        tree.write("Gemfile", content).expect("gemfile");
        let mut state = RunState::new("rails", tree.path());
        run_pipeline(&tree, &capybara, &mut state, &Options::new(), hooks).expect("run");
        assert_eq!(
            tree.read("Gemfile").expect("read"),
            "group :test do\n  gem 'capybara'\nend\n\ngroup :test do\nend\n"
        );
    }
}

#[test]
fn rendered_templates_see_run_options() {
    let tree = TestTree::new().expect("tree");
    let commands = RecordingCommands::new();
    let checkpoint = RecordingCheckpoint::new();
    let templates = MemoryTemplates::new().with("app.yml", "api: {{ api }}\nname: {{ name }}\n");
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let config = pipeline(
        "rails",
        vec![step(
            "Write config",
            vec![Mutation::CopyTemplate {
                template: "app.yml".to_string(),
                dest: Some(PathBuf::from("config/app.yml")),
                render: true,
            }],
        )],
    );
    let mut options = Options::new();
    options.insert("api".to_string(), json!(true));
    options.insert("name".to_string(), json!("shop"));
    let mut state = RunState::new("rails", tree.path());

    run_pipeline(&tree, &config, &mut state, &options, hooks).expect("run");
    assert_eq!(
        tree.read("config/app.yml").expect("read"),
        "api: true\nname: shop\n"
    );
}

/// Pipeline defaults for `rspec_version` and `gem_source`, overridable per run.
fn rendered_gem_pipeline() -> Pipeline {
    let mut rspec = insert_after(
        "Gemfile",
        "group :development, :test do\n",
        "  gem 'rspec-rails', '~> {{ rspec_version }}'\n",
    );
    if let Mutation::InsertAfter { render, .. } = &mut rspec {
        *render = true;
    }
    let source = Mutation::Replace {
        file: "Gemfile".into(),
        pattern: Anchor::literal("source 'https://rubygems.org'"),
        replacement: "source '{{ gem_source }}'".to_string(),
        first_only: true,
        render: true,
    };
    let mut gems = pipeline("rails", vec![step("Add rspec", vec![rspec, source])]);
    gems.options.insert("rspec_version".to_string(), json!("6.0"));
    gems.options.insert("gem_source".to_string(), json!("https://rubygems.org"));
    gems
}

#[test]
fn rendered_payloads_take_run_options_over_pipeline_defaults() {
    let tree = TestTree::new().expect("tree");
    tree.write("Gemfile", GEMFILE).expect("gemfile");
    let commands = RecordingCommands::new();
    let checkpoint = RecordingCheckpoint::new();
    let templates = MemoryTemplates::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let mut options = Options::new();
    options.insert("rspec_version".to_string(), json!("7.1"));
    let mut state = RunState::new("rails", tree.path());

    run_pipeline(&tree, &rendered_gem_pipeline(), &mut state, &options, hooks).expect("run");
    assert_eq!(
        tree.read("Gemfile").expect("read"),
        "source 'https://rubygems.org'\n\ngroup :development, :test do\n  gem 'rspec-rails', '~> 7.1'\nend\n"
    );
}

#[test]
fn undefined_payload_variable_fails_the_step_before_writing() {
    let tree = TestTree::new().expect("tree");
    tree.write("Gemfile", GEMFILE).expect("gemfile");
    let commands = RecordingCommands::new();
    let checkpoint = RecordingCheckpoint::new();
    let templates = MemoryTemplates::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let mut gems = rendered_gem_pipeline();
    gems.options.remove("gem_source");
    let mut state = RunState::new("rails", tree.path());

    let err = run_pipeline(&tree, &gems, &mut state, &Options::new(), hooks)
        .expect_err("undefined variable");
    assert!(matches!(err, ScaffoldError::Io { .. }), "{err}");
    assert_eq!(err.step(), Some("Add rspec"));
    assert_eq!(tree.read("Gemfile").expect("read"), GEMFILE);
    assert!(checkpoint.commits().is_empty());
}

#[test]
fn malformed_pipeline_touches_nothing() {
    let tree = TestTree::new().expect("tree");
    tree.write("Gemfile", GEMFILE).expect("gemfile");
    let commands = RecordingCommands::new();
    let checkpoint = RecordingCheckpoint::new();
    let templates = MemoryTemplates::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let mut stack = test_stack();
    stack.steps[2].name = "Add rspec".to_string();
    let mut state = RunState::new("rails", tree.path());

    let err = run_pipeline(&tree, &stack, &mut state, &Options::new(), hooks)
        .expect_err("duplicate names");
    assert!(
        matches!(err, ScaffoldError::MalformedStepDefinition { .. }),
        "{err}"
    );
    assert_eq!(err.step(), None);
    assert_eq!(tree.read("Gemfile").expect("read"), GEMFILE);
    assert!(commands.calls().is_empty());
}

#[test]
fn run_state_is_persisted_after_each_step() {
    let tree = TestTree::new().expect("tree");
    tree.write("Gemfile", GEMFILE).expect("gemfile");
    let commands = RecordingCommands::new().fail_with("bundle install", 1);
    let checkpoint = RecordingCheckpoint::new();
    let templates = MemoryTemplates::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let options = Options::new();
    let state_path = tree.path().join(".scaffold/run_state.json");
    let mut stack = test_stack();
    stack.steps[0].commands.clear();
    let mut state = RunState::new("rails", tree.path());

    let mut runner = PipelineRunner::new(Workspace::new(tree.path(), false), &options, hooks)
        .with_state_path(&state_path);
    runner.run(&stack, &mut state).expect_err("capybara install fails");

    let saved = load_run_state(&state_path).expect("saved state");
    assert_eq!(saved.pipeline, "rails");
    assert_eq!(saved.completed_steps, vec!["Add rspec", "Add test gem group"]);
}

#[test]
fn sample_rails_catalog_applies_to_api_skeleton() {
    let pipeline_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../pipelines/rails_api.toml");
    let rails = load_pipeline(&pipeline_path).expect("sample pipeline");
    let template_root = templates_dir(&rails, &pipeline_path).expect("templates dir");
    let templates = DirTemplates::new(&template_root);

    let tree = TestTree::new().expect("tree");
    tree.write(
        "Gemfile",
        "source 'https://rubygems.org'\n\n\
         # Bundle edge Rails instead: gem 'rails', github: 'rails/rails'\n\
         gem 'rails', '~> 7.1.0'\n\
         # gem 'rack-cors'\n\n\
         group :development, :test do\n\
         \x20 # See https://guides.rubyonrails.org/debugging_rails_applications.html\n\
         \x20 gem 'debug', platforms: %i[ mri windows ]\n\
         end\n",
    )
    .expect("gemfile");
    tree.write(
        "spec/rails_helper.rb",
        "require 'spec_helper'\nENV['RAILS_ENV'] ||= 'test'\n",
    )
    .expect("rails helper");

    let commands = RecordingCommands::new();
    let checkpoint = RecordingCheckpoint::new();
    let hooks = Collaborators {
        commands: &commands,
        checkpoint: &checkpoint,
        templates: &templates,
    };
    let mut options = Options::new();
    options.insert("api".to_string(), json!(true));
    options.insert("rspec_version".to_string(), json!("7.1"));
    let mut state = RunState::new(rails.name.clone(), tree.path());

    run_pipeline(&tree, &rails, &mut state, &options, hooks).expect("catalog run");

    assert_eq!(
        tree.read("Gemfile").expect("read"),
        "source 'https://rubygems.org'\n\n\
         gem 'rails', '~> 7.1.0'\n\
         # gem 'rack-cors'\n\n\
         group :test do\n\
         \x20 gem 'shoulda-matchers', '~> 5.3'\n\
         \x20 gem 'factory_bot_rails', '~> 6.2'\n\
         \x20 gem 'capybara', '~> 3.39'\n\
         end\n\n\
         group :development, :test do\n\
         \x20 gem 'rubocop', require: false\n\
         \x20 gem 'rubocop-performance', require: false\n\
         \x20 gem 'rubocop-rails', require: false\n\
         \x20 gem 'rspec-rails', '~> 7.1'\n\
         \x20 gem 'debug', platforms: %i[ mri windows ]\n\
         end\n"
    );
    assert_eq!(
        tree.read("spec/rails_helper.rb").expect("read"),
        "require 'spec_helper'\n\
         require 'support/shoulda_matchers'\n\
         require 'support/factory_bot'\n\
         require 'support/capybara'\n\
         ENV['RAILS_ENV'] ||= 'test'\n"
    );
    assert_eq!(
        tree.read(".rubocop.yml").expect("read"),
        fs::read_to_string(template_root.join(".rubocop.yml")).expect("template")
    );
    assert!(tree.exists("spec/support/capybara.rb"));
    assert_eq!(
        checkpoint.commits(),
        rails
            .steps
            .iter()
            .map(|s| s.name.clone())
            .collect::<Vec<_>>()
    );
    assert_eq!(commands.calls().len(), 9);
}
