use hbnb_core::{
    AttrValue, Console, DbStorage, FileStorage, Flow, Kind, RelationalConfig, Storage, PROMPT,
};
use std::io::Cursor;

struct Session {
    console: Console<Vec<u8>>,
    _dir: tempfile::TempDir,
}

impl Session {
    fn file() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("file.json"));
        Self {
            console: Console::new(Box::new(storage), Vec::new()),
            _dir: dir,
        }
    }

    fn db() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hbnb.db");
        let storage =
            DbStorage::open(RelationalConfig::for_database(path.to_string_lossy().into_owned()))
                .unwrap();
        Self {
            console: Console::new(Box::new(storage), Vec::new()),
            _dir: dir,
        }
    }

    /// Runs one line and returns exactly what it printed.
    fn exec(&mut self, line: &str) -> String {
        let before = self.console.output().len();
        let flow = self.console.execute(line).unwrap();
        assert_eq!(flow, Flow::Continue, "line `{line}` ended the session");
        String::from_utf8(self.console.output()[before..].to_vec()).unwrap()
    }

    fn create(&mut self, line: &str) -> String {
        let id = self.exec(line).trim_end().to_string();
        assert_eq!(id.len(), 36, "unexpected create output `{id}`");
        id
    }

    fn storage(&self) -> &dyn Storage {
        self.console.storage()
    }
}

#[test]
fn validation_errors_follow_fixed_order() {
    let mut session = Session::file();
    let id = session.create("create BaseModel");

    assert_eq!(session.exec("create"), "** class name missing **\n");
    assert_eq!(session.exec("create MyModel"), "** class doesn't exist **\n");
    assert_eq!(session.exec("show"), "** class name missing **\n");
    assert_eq!(session.exec("show MyModel 1234"), "** class doesn't exist **\n");
    assert_eq!(session.exec("show BaseModel"), "** instance id missing **\n");
    assert_eq!(session.exec("show BaseModel 1234"), "** no instance found **\n");
    assert_eq!(session.exec("destroy"), "** class name missing **\n");
    assert_eq!(session.exec("destroy BaseModel"), "** instance id missing **\n");
    assert_eq!(session.exec("destroy BaseModel 1234"), "** no instance found **\n");
    assert_eq!(session.exec("update"), "** class name missing **\n");
    assert_eq!(session.exec("update MyModel"), "** class doesn't exist **\n");
    assert_eq!(session.exec("update BaseModel"), "** instance id missing **\n");
    assert_eq!(session.exec("update BaseModel 1234"), "** no instance found **\n");
    assert_eq!(
        session.exec(&format!("update BaseModel {id}")),
        "** attribute name missing **\n"
    );
    let before = session.storage().get(Kind::BaseModel, &id).unwrap().unwrap();
    assert_eq!(
        session.exec(&format!("update BaseModel {id} first_name")),
        "** value missing **\n"
    );
    let after = session.storage().get(Kind::BaseModel, &id).unwrap().unwrap();
    assert_eq!(after.attrs(), before.attrs());
    assert!(after.get("first_name").is_none());
    assert_eq!(after.updated_at(), before.updated_at());
    assert_eq!(session.exec("all MyModel"), "** class doesn't exist **\n");
    assert_eq!(session.exec("count MyModel"), "** class doesn't exist **\n");
}

#[test]
fn create_show_all_destroy_flow() {
    let mut session = Session::file();
    let id = session.create("create BaseModel");

    let shown = session.exec(&format!("show BaseModel {id}"));
    assert!(shown.starts_with(&format!("[BaseModel] ({id}) {{'id': '{id}'")));
    assert!(shown.contains("'created_at': '"));
    assert!(shown.contains("'updated_at': '"));

    let listed = session.exec("all BaseModel");
    assert!(listed.starts_with("[\"[BaseModel] ("));
    assert!(listed.contains(&id));
    assert!(listed.ends_with("}\"]\n"));

    assert_eq!(session.exec(&format!("destroy BaseModel {id}")), "");
    assert_eq!(
        session.exec(&format!("show BaseModel {id}")),
        "** no instance found **\n"
    );
    assert_eq!(session.exec("all BaseModel"), "[]\n");
}

#[test]
fn create_with_parameters_coerces_and_drops_bad_values() {
    let mut session = Session::file();
    let id = session.create(
        "create Place city_id=\"0001\" user_id=\"0001\" name=\"My_little_house\" \
         number_rooms=4 number_bathrooms=2 max_guest=10 price_by_night=300 \
         latitude=37.773972 longitude=-122.431297",
    );

    let shown = session.exec(&format!("show Place {id}"));
    assert!(shown.contains("'city_id': '0001'"));
    assert!(shown.contains("'user_id': '0001'"));
    assert!(shown.contains("'name': 'My little house'"));
    assert!(shown.contains("'number_rooms': 4"));
    assert!(shown.contains("'number_bathrooms': 2"));
    assert!(shown.contains("'max_guest': 10"));
    assert!(shown.contains("'price_by_night': 300"));
    assert!(shown.contains("'latitude': 37.773972"));
    assert!(shown.contains("'longitude': -122.431297"));

    let id = session.create("create Place name=\"Shack\" longitude=a rooms");
    let shown = session.exec(&format!("show Place {id}"));
    assert!(shown.contains("'name': 'Shack'"));
    assert!(!shown.contains("longitude"));
    assert!(!shown.contains("rooms"));
}

#[test]
fn create_unescapes_embedded_quotes() {
    let mut session = Session::file();
    let id = session.create(r#"create State name="Say_\"hi\"""#);

    let state = session.storage().get(Kind::State, &id).unwrap().unwrap();
    assert_eq!(
        state.get("name").and_then(|value| value.as_text()),
        Some("Say \"hi\"")
    );
}

#[test]
fn update_sets_coerced_value_and_ignores_protected_names() {
    let mut session = Session::file();
    let id = session.create("create Place name=\"Loft\"");
    let before = session
        .storage()
        .get(Kind::Place, &id)
        .unwrap()
        .unwrap()
        .updated_at();

    assert_eq!(session.exec(&format!("update Place {id} number_rooms 7")), "");
    assert_eq!(
        session.exec(&format!("update Place {id} description \"Sunny loft\"")),
        ""
    );
    assert_eq!(session.exec(&format!("update Place {id} max_guest \"abc\"")), "");
    assert_eq!(session.exec(&format!("update Place {id} id \"other\"")), "");

    let place = session.storage().get(Kind::Place, &id).unwrap().unwrap();
    assert_eq!(place.id(), id);
    assert!(place.updated_at() >= before);
    assert_eq!(place.get("number_rooms"), Some(&AttrValue::Int(7)));
    assert_eq!(
        place.get("description").and_then(|value| value.as_text()),
        Some("Sunny loft")
    );
    assert!(place.get("max_guest").is_none());
}

#[test]
fn count_tracks_creations_per_kind() {
    let mut session = Session::file();

    assert_eq!(session.exec("State.count()"), "0\n");
    session.create("create State name=\"California\"");
    assert_eq!(session.exec("State.count()"), "1\n");
    assert_eq!(session.exec("count State"), "1\n");
    assert_eq!(session.exec("City.count()"), "0\n");

    session.create("create City name=\"Napa\"");
    assert_eq!(session.exec("count"), "2\n");
}

#[test]
fn all_without_kind_lists_every_kind() {
    let mut session = Session::file();
    session.create("create State name=\"California\"");
    session.create("create User email=\"a@b.c\"");

    let listed = session.exec("all");
    assert!(listed.contains("[State] ("));
    assert!(listed.contains("[User] ("));
    assert_eq!(session.exec("State.all()").matches("[State] (").count(), 1);
    assert!(!session.exec("State.all()").contains("[User] ("));
}

#[test]
fn dot_call_syntax_matches_verb_first_behavior() {
    let mut session = Session::file();
    let id = session.create("User.create()");

    let shown = session.exec(&format!("User.show(\"{id}\")"));
    assert!(shown.starts_with(&format!("[User] ({id})")));

    assert_eq!(
        session.exec(&format!("User.update(\"{id}\", \"first_name\", \"John\")")),
        ""
    );
    assert_eq!(
        session.exec(&format!(
            "User.update(\"{id}\", {{'last_name': \"Doe\", 'age': 89}})"
        )),
        ""
    );
    let shown = session.exec(&format!("User.show({id})"));
    assert!(shown.contains("'first_name': 'John'"));
    assert!(shown.contains("'last_name': 'Doe'"));
    assert!(shown.contains("'age': 89"));

    assert_eq!(session.exec("User.show()"), "** instance id missing **\n");
    assert_eq!(session.exec("User.show(\"nope\")"), "** no instance found **\n");
    assert_eq!(
        session.exec(&format!("User.update(\"{id}\")")),
        "** attribute name missing **\n"
    );
    let before = session.storage().get(Kind::User, &id).unwrap().unwrap();
    assert_eq!(
        session.exec(&format!("User.update(\"{id}\", \"email\")")),
        "** value missing **\n"
    );
    let after = session.storage().get(Kind::User, &id).unwrap().unwrap();
    assert_eq!(after.attrs(), before.attrs());
    assert!(after.get("email").is_none());
    assert_eq!(after.updated_at(), before.updated_at());
    assert_eq!(
        session.exec(&format!("User.update(\"{id}\", {{}})")),
        "** attribute name missing **\n"
    );
    assert_eq!(session.exec("Galaxy.show(\"1\")"), "** class doesn't exist **\n");

    assert_eq!(session.exec(&format!("User.destroy(\"{id}\")")), "");
    assert_eq!(session.exec("User.count()"), "0\n");
}

#[test]
fn unknown_lines_report_syntax_and_blank_lines_print_nothing() {
    let mut session = Session::file();

    assert_eq!(session.exec("frobnicate"), "*** Unknown syntax: frobnicate\n");
    assert_eq!(
        session.exec("State.explode()"),
        "*** Unknown syntax: State.explode()\n"
    );
    assert_eq!(session.exec(""), "");
    assert_eq!(session.exec("   "), "");
}

#[test]
fn help_lists_commands() {
    let mut session = Session::file();
    let help = session.exec("help");
    for command in ["EOF", "all", "count", "create", "destroy", "quit", "show", "update"] {
        assert!(help.contains(command), "help misses `{command}`");
    }
}

#[test]
fn quit_and_eof_word_end_the_loop() {
    let mut session = Session::file();
    assert_eq!(session.console.execute("quit").unwrap(), Flow::Quit);
    assert_eq!(session.console.execute("EOF").unwrap(), Flow::Quit);

    let mut session = Session::file();
    session
        .console
        .run(Cursor::new("create State name=\"A\"\nquit\ncreate State name=\"B\"\n"))
        .unwrap();
    assert_eq!(session.storage().count(Some(Kind::State)).unwrap(), 1);
}

#[test]
fn run_stops_at_end_of_input_and_prints_prompt_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path().join("file.json"));
    let mut console = Console::new(Box::new(storage), Vec::new()).with_prompt(true);

    console.run(Cursor::new("count State\n")).unwrap();

    let (_, output) = console.into_parts();
    let output = String::from_utf8(output).unwrap();
    assert_eq!(output, format!("{PROMPT}0\n{PROMPT}\n"));
}

#[test]
fn mutations_are_flushed_to_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.json");
    let mut console = Console::new(Box::new(FileStorage::open(&path)), Vec::new());

    console.execute("create State name=\"California\"").unwrap();

    let mut reopened = FileStorage::open(&path);
    reopened.reload().unwrap();
    assert_eq!(reopened.count(Some(Kind::State)).unwrap(), 1);
}

#[test]
fn failed_flush_reports_error_and_discards_the_change() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path().join("missing_dir").join("file.json"));
    let mut console = Console::new(Box::new(storage), Vec::new());

    console.execute("create State name=\"California\"").unwrap();
    let printed = String::from_utf8(console.output().clone()).unwrap();
    assert!(printed.starts_with("** "));
    assert!(printed.ends_with(" **\n"));

    assert_eq!(console.storage().count(Some(Kind::State)).unwrap(), 0);
    console.execute("count State").unwrap();
    let printed = String::from_utf8(console.output().clone()).unwrap();
    assert!(printed.ends_with("\n0\n"));
}

#[test]
fn db_backend_hides_base_model_and_reports_storage_errors() {
    let mut session = Session::db();

    assert_eq!(session.exec("create BaseModel"), "** class doesn't exist **\n");
    assert_eq!(session.exec("all BaseModel"), "** class doesn't exist **\n");

    let failed = session.exec("create City");
    assert!(failed.starts_with("** "));
    assert!(failed.ends_with(" **\n"));

    let state_id = session.create("create State name=\"California\"");
    let city_id = session.create(&format!(
        "create City name=\"San_Francisco\" state_id=\"{state_id}\""
    ));
    assert_eq!(session.exec("count City"), "1\n");

    assert_eq!(session.exec(&format!("destroy State {state_id}")), "");
    assert_eq!(
        session.exec(&format!("show City {city_id}")),
        "** no instance found **\n"
    );
    assert_eq!(session.exec("count"), "0\n");
}
