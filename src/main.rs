use std::path::PathBuf;

use anyhow::Result;
use clap::{arg, command, value_parser, ArgAction, ArgMatches, Command};
use httpmate::execute::{self, EnvCommand, RequestEdit, ScopeTarget};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn collection_arg() -> clap::Arg {
    arg!(-c --collection <COLLECTION> "Collection name or id").value_parser(value_parser!(String))
}

/// Options shared by `add` and `edit`.
fn request_args(command: Command) -> Command {
    command
        .arg(collection_arg().required(true))
        .arg(arg!(--description <TEXT> "free text description"))
        .arg(arg!(--body <BODY> "request body"))
        .arg(
            arg!(-H --header <HEADER> "header as 'Name: value', repeatable")
                .value_parser(execute::header_arg)
                .action(ArgAction::Append),
        )
        .arg(
            arg!(-q --query <PAIR> "query parameter as 'name=value', repeatable")
                .value_parser(execute::query_arg)
                .action(ArgAction::Append),
        )
}

fn cli() -> Command {
    Command::new("httpmate")
        .author(clap::crate_authors!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            arg!(-w --workspace <FILE> "Workspace file")
                .env("HTTPMATE_WORKSPACE")
                .default_value("httpmate.json")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            command!("new")
                .about("create a collection")
                .arg(arg!(<NAME> "collection name"))
                .arg(arg!(--operations <FILE> "normalized api operations (json)").value_parser(value_parser!(PathBuf)))
                .arg(arg!(--"base-url" <URL> "base url used when the operations carry none")),
        )
        .subcommand(
            command!("vars")
                .about("print the effective variables of a collection")
                .arg(collection_arg().required(true)),
        )
        .subcommand(
            command!("show")
                .about("print a request with its variables resolved")
                .arg(collection_arg().required(true))
                .arg(arg!(<REQUEST> "request id, name or operation like 'GET /pets'"))
                .arg(arg!(--curl "print as curl command").action(ArgAction::SetTrue)),
        )
        .subcommand(
            command!("run")
                .about("run one or multiple requests of a collection")
                .arg(collection_arg().required(true))
                .arg(
                    arg!([REQUESTS] "requests that shall be executed, all saved ones when omitted")
                        .value_parser(value_parser!(String))
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            command!("sync")
                .about("reload the api operations and mark saved requests whose operation is gone")
                .arg(collection_arg().required(true))
                .arg(arg!(--operations <FILE> "normalized api operations (json)").value_parser(value_parser!(PathBuf)))
                .arg(arg!(--"base-url" <URL> "base url used when the operations carry none")),
        )
        .subcommand(
            command!("promote")
                .about("save a copy of a generated request")
                .arg(collection_arg().required(true))
                .arg(arg!(<OPERATION> "operation, e.g. 'GET /pets/{id}'")),
        )
        .subcommand(request_args(
            command!("add")
                .about("save a new request")
                .arg(arg!(<NAME> "request name"))
                .arg(arg!(<METHOD> "http method"))
                .arg(arg!(<URL> "url, may contain {{variables}}")),
        ))
        .subcommand(request_args(
            command!("edit")
                .about("change a saved request")
                .arg(arg!(<REQUEST> "request id or name"))
                .arg(arg!(--name <NAME> "new name"))
                .arg(arg!(--method <METHOD> "new http method"))
                .arg(arg!(--url <URL> "new url"))
                .arg(arg!(--"no-body" "drop the body").action(ArgAction::SetTrue))
                .arg(arg!(--"remove-header" <NAME> "header to drop, repeatable").action(ArgAction::Append))
                .arg(arg!(--"remove-query" <NAME> "query parameter to drop, repeatable").action(ArgAction::Append)),
        ))
        .subcommand(
            command!("rm")
                .about("delete a saved request")
                .arg(collection_arg().required(true))
                .arg(arg!(<REQUEST> "request id or name")),
        )
        .subcommand(
            command!("dup")
                .about("save a copy of a saved request")
                .arg(collection_arg().required(true))
                .arg(arg!(<REQUEST> "request id or name")),
        )
        .subcommand(
            command!("set")
                .about("set a variable (global unless --collection and/or --env are given)")
                .arg(collection_arg())
                .arg(arg!(-e --env <ENV> "environment name"))
                .arg(arg!(<NAME> "variable name"))
                .arg(arg!(<VALUE> "variable value")),
        )
        .subcommand(
            command!("unset")
                .about("remove a variable")
                .arg(collection_arg())
                .arg(arg!(-e --env <ENV> "environment name"))
                .arg(arg!(<NAME> "variable name")),
        )
        .subcommand(
            command!("env")
                .about("manage environments; with --collection they are private to it")
                .subcommand_required(true)
                .arg(collection_arg().global(true))
                .arg(
                    arg!(--local "target the collection's own environments")
                        .action(ArgAction::SetTrue)
                        .global(true),
                )
                .subcommand(command!("list"))
                .subcommand(command!("create").arg(arg!(<NAME>)))
                .subcommand(command!("delete").arg(arg!(<NAME>)))
                .subcommand(command!("rename").arg(arg!(<OLD>)).arg(arg!(<NEW>)))
                .subcommand(command!("use").arg(arg!(<NAME>)))
                .subcommand(command!("clear")),
        )
}

fn string<'a>(matches: &'a ArgMatches, id: &str) -> Option<&'a str> {
    matches.get_one::<String>(id).map(String::as_str)
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> &'a str {
    string(matches, id).unwrap_or_default()
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|it| it.cloned().collect())
        .unwrap_or_default()
}

fn pairs(matches: &ArgMatches, id: &str) -> Vec<(String, String)> {
    matches
        .get_many::<(String, String)>(id)
        .map(|it| it.cloned().collect())
        .unwrap_or_default()
}

fn request_edit(matches: &ArgMatches) -> RequestEdit {
    RequestEdit {
        description: matches.get_one::<String>("description").cloned(),
        body: matches.get_one::<String>("body").cloned(),
        headers: pairs(matches, "header"),
        query: pairs(matches, "query"),
        ..RequestEdit::default()
    }
}

fn environment(workspace: &std::path::Path, matches: &ArgMatches) -> Result<()> {
    let collection = string(matches, "collection");
    let local = matches.get_flag("local");
    let (name, sub) = matches.subcommand().unwrap_or(("list", matches));
    let command = match name {
        "create" => EnvCommand::Create(required(sub, "NAME")),
        "delete" => EnvCommand::Delete(required(sub, "NAME")),
        "rename" => EnvCommand::Rename(required(sub, "OLD"), required(sub, "NEW")),
        "use" => EnvCommand::Use(required(sub, "NAME")),
        "clear" => EnvCommand::Clear,
        _ => EnvCommand::List,
    };
    for line in execute::environment(workspace, collection, local, command)? {
        println!("{}", line);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "httpmate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let matches = cli().get_matches();
    let workspace = matches
        .get_one::<PathBuf>("workspace")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("httpmate.json"));

    let result = match matches.subcommand() {
        Some(("new", m)) => execute::new_collection(
            &workspace,
            required(m, "NAME"),
            m.get_one::<PathBuf>("operations").cloned(),
            m.get_one::<String>("base-url").cloned(),
        )
        .map(|id| println!("{} {}", id, required(m, "NAME"))),
        Some(("vars", m)) => execute::variables(&workspace, required(m, "collection")).map(|variables| {
            for (name, value) in variables {
                println!("{} = {}", name, value);
            }
        }),
        Some(("show", m)) => execute::show_request(
            &workspace,
            required(m, "collection"),
            required(m, "REQUEST"),
            m.get_flag("curl"),
        )
        .map(|text| println!("{}", text)),
        Some(("run", m)) => execute::run_requests(
            &workspace,
            required(m, "collection"),
            m.get_many::<String>("REQUESTS").map(|it| it.collect()).unwrap_or_default(),
        ),
        Some(("sync", m)) => execute::sync(
            &workspace,
            required(m, "collection"),
            m.get_one::<PathBuf>("operations").cloned(),
            m.get_one::<String>("base-url").cloned(),
        )
        .map(|report| print!("{}", report)),
        Some(("promote", m)) => {
            execute::promote_request(&workspace, required(m, "collection"), required(m, "OPERATION"))
                .map(|id| println!("{}", id))
        }
        Some(("add", m)) => execute::add_request(
            &workspace,
            required(m, "collection"),
            required(m, "NAME"),
            required(m, "METHOD"),
            required(m, "URL"),
            request_edit(m),
        )
        .map(|id| println!("{}", id)),
        Some(("edit", m)) => {
            let edit = RequestEdit {
                name: m.get_one::<String>("name").cloned(),
                method: m.get_one::<String>("method").cloned(),
                url: m.get_one::<String>("url").cloned(),
                clear_body: m.get_flag("no-body"),
                remove_headers: strings(m, "remove-header"),
                remove_query: strings(m, "remove-query"),
                ..request_edit(m)
            };
            execute::edit_request(&workspace, required(m, "collection"), required(m, "REQUEST"), edit)
                .map(|id| println!("{}", id))
        }
        Some(("rm", m)) => execute::remove_request(&workspace, required(m, "collection"), required(m, "REQUEST"))
            .map(|removed| println!("removed {} ({})", removed.name, removed.id)),
        Some(("dup", m)) => execute::duplicate_request(&workspace, required(m, "collection"), required(m, "REQUEST"))
            .map(|id| println!("{}", id)),
        Some(("set", m)) => execute::set_variable(
            &workspace,
            ScopeTarget { collection: string(m, "collection"), environment: string(m, "env") },
            required(m, "NAME"),
            Some(required(m, "VALUE")),
        ),
        Some(("unset", m)) => execute::set_variable(
            &workspace,
            ScopeTarget { collection: string(m, "collection"), environment: string(m, "env") },
            required(m, "NAME"),
            None,
        ),
        Some(("env", m)) => environment(&workspace, m),
        _ => unreachable!("this should've been prevented"),
    };
    return result;
}
