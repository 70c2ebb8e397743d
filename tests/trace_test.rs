// Integration tests for the snapshot tracer

use ctrace::runtime::{
    CallStack, Member, MemoryImage, OutputBuffer, RuntimeView, SymbolEntry, SymbolTable, TypeDesc,
};
use ctrace::trace::{build_address_index, produce_snapshot, JsonLinesSink, TraceError, Tracer};
use serde_json::json;

/// Interpreter-state fixture: builds the memory image and symbol tables an
/// interpreter host would hand to the tracer.
struct Fixture {
    globals: SymbolTable,
    stack: CallStack,
    memory: MemoryImage,
    output: OutputBuffer,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            globals: SymbolTable::new(),
            stack: CallStack::new(),
            memory: MemoryImage::new(),
            output: OutputBuffer::new(),
        }
    }

    fn view(&self) -> RuntimeView<'_> {
        RuntimeView::new(&self.globals, &self.stack, &self.memory).with_output(&self.output)
    }

    /// Allocate storage, declare a global, return its address.
    fn global(&mut self, name: &str, ty: TypeDesc) -> u64 {
        let addr = self.memory.alloc(ty.size_bytes());
        self.globals.declare(SymbolEntry::new(name, ty, addr));
        addr
    }

    /// Allocate storage, declare a local in the innermost frame, return its
    /// address.
    fn local(&mut self, name: &str, ty: TypeDesc) -> u64 {
        let addr = self.memory.alloc(ty.size_bytes());
        self.stack
            .innermost_mut()
            .expect("no active frame")
            .locals
            .declare(SymbolEntry::new(name, ty, addr));
        addr
    }

    /// Allocate a NUL-terminated string in storage, return its base address.
    fn string(&mut self, text: &str) -> u64 {
        let bytes = text.as_bytes();
        let addr = self.memory.alloc(bytes.len() + 1);
        self.memory.write_bytes(addr, bytes).expect("string write");
        addr
    }
}

fn point_type() -> TypeDesc {
    TypeDesc::Struct {
        tag: "Point".to_string(),
        members: vec![
            Member::new("x", TypeDesc::Int),
            Member::new("y", TypeDesc::Int),
        ],
    }
}

#[test]
fn no_event_before_execution_starts() {
    // A global exists but no call stack is active yet.
    let mut fx = Fixture::new();
    let addr = fx.global("x", TypeDesc::Int);
    fx.memory.write_i32(addr, 5).unwrap();

    let event = produce_snapshot(&fx.view(), 1).expect("snapshot failed");
    assert!(event.is_none());

    let mut tracer = Tracer::new(JsonLinesSink::new(Vec::new()));
    let emitted = tracer.step(&fx.view(), 1).expect("step failed");
    assert!(!emitted);
    assert!(tracer.into_sink().into_inner().is_empty());
}

#[test]
fn int_array_local() {
    // int arr[3] = {1, 2, 3}; inside main.
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    let base = fx.local("arr", TypeDesc::array_of(TypeDesc::Int, 3));
    for (i, v) in [1, 2, 3].iter().enumerate() {
        fx.memory.write_i32(base + 4 * i as u64, *v).unwrap();
    }

    let event = produce_snapshot(&fx.view(), 3).unwrap().unwrap();
    let key = base.to_string();

    let frame = &event.stack_to_render[0];
    assert_eq!(frame.ordered_varnames, vec!["arr".to_string()]);
    assert_eq!(frame.encoded_locals["arr"], json!(["REF", key]));

    assert_eq!(
        event.heap[&key],
        json!([
            "ARRAY",
            [3],
            ["ADDR", base, 1],
            ["ADDR", base + 4, 2],
            ["ADDR", base + 8, 3]
        ])
    );
}

#[test]
fn struct_local() {
    // struct Point p = {1, 2};
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    let base = fx.local("p", point_type());
    fx.memory.write_i32(base, 1).unwrap();
    fx.memory.write_i32(base + 4, 2).unwrap();

    let event = produce_snapshot(&fx.view(), 5).unwrap().unwrap();
    let key = base.to_string();

    assert_eq!(
        event.stack_to_render[0].encoded_locals["p"],
        json!(["REF", key])
    );
    assert_eq!(
        event.heap[&key],
        json!([
            "STRUCT",
            "Point",
            [],
            ["x", ["ADDR", base, 1]],
            ["y", ["ADDR", base + 4, 2]]
        ])
    );
}

#[test]
fn char_pointer_traces_as_string() {
    // char *name = "hi"; traced as a char array of strlen + 1 elements.
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    let text = fx.string("hi");
    let slot = fx.local("name", TypeDesc::pointer_to(TypeDesc::Char));
    fx.memory.write_addr(slot, text).unwrap();

    let event = produce_snapshot(&fx.view(), 2).unwrap().unwrap();
    let key = text.to_string();

    assert_eq!(
        event.stack_to_render[0].encoded_locals["name"],
        json!(["REF", key])
    );
    assert_eq!(
        event.heap[&key],
        json!([
            "ARRAY",
            [3],
            ["ADDR", text, "h"],
            ["ADDR", text + 1, "i"],
            ["ADDR", text + 2, "\\0"]
        ])
    );
}

#[test]
fn declaration_order_is_preserved() {
    let mut fx = Fixture::new();
    fx.global("alpha", TypeDesc::Int);
    fx.global("beta", TypeDesc::Int);
    fx.global("gamma", TypeDesc::Int);
    fx.stack.push_frame("main");
    fx.local("zulu", TypeDesc::Int);
    fx.local("yankee", TypeDesc::Int);
    fx.local("xray", TypeDesc::Int);

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    assert_eq!(event.ordered_globals, vec!["alpha", "beta", "gamma"]);
    assert_eq!(
        event.stack_to_render[0].ordered_varnames,
        vec!["zulu", "yankee", "xray"]
    );
}

#[test]
fn reserved_globals_are_suppressed() {
    let mut fx = Fixture::new();
    fx.global("__exit_value", TypeDesc::Int);
    fx.global("visible", TypeDesc::Int);
    fx.stack.push_frame("main");

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    assert_eq!(event.ordered_globals, vec!["visible"]);
    assert!(!event.globals.contains_key("__exit_value"));
}

#[test]
fn null_sentinel_is_always_present() {
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    fx.local("x", TypeDesc::Int);

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    assert_eq!(event.heap["0"], json!(["NULLPOINTER", "NULL"]));
    assert_eq!(event.heap.keys().filter(|k| *k == "0").count(), 1);
}

#[test]
fn multi_dimensional_array_dimensions() {
    // int cube[2][3][4]: dimensions [2, 3, 4], 24 elements.
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    let ty = TypeDesc::array_of(
        TypeDesc::array_of(TypeDesc::array_of(TypeDesc::Int, 4), 3),
        2,
    );
    let base = fx.local("cube", ty);

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    let entry = event.heap[&base.to_string()].as_array().expect("array entry");
    assert_eq!(entry[0], json!("ARRAY"));
    assert_eq!(entry[1], json!([2, 3, 4]));
    // Tag + dims + one encoded leaf per element.
    assert_eq!(entry.len(), 2 + 24);
}

#[test]
fn struct_entry_has_one_member_per_field() {
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    let ty = TypeDesc::Struct {
        tag: "Triple".to_string(),
        members: vec![
            Member::new("a", TypeDesc::Int),
            Member::new("b", TypeDesc::Char),
            Member::new("c", TypeDesc::Long),
        ],
    };
    let base = fx.local("t", ty);

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    let entry = event.heap[&base.to_string()].as_array().expect("struct entry");
    // Fixed 3-element header, then one encoding per field, in field order.
    assert_eq!(entry.len(), 3 + 3);
    assert_eq!(entry[2], json!([]));
    assert_eq!(entry[3][0], json!("a"));
    assert_eq!(entry[4][0], json!("b"));
    assert_eq!(entry[5][0], json!("c"));
}

#[test]
fn snapshots_are_deterministic() {
    let mut fx = Fixture::new();
    let g = fx.global("counter", TypeDesc::Int);
    fx.memory.write_i32(g, 7).unwrap();
    fx.stack.push_frame("main");
    let p = fx.local("p", point_type());
    fx.memory.write_i32(p, 3).unwrap();
    fx.memory.write_i32(p + 4, 4).unwrap();
    fx.output.print("out\n");

    let first = produce_snapshot(&fx.view(), 9).unwrap().unwrap();
    let second = produce_snapshot(&fx.view(), 9).unwrap().unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn aliased_strings_share_one_heap_entry() {
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    let text = fx.string("shared");
    let a = fx.local("a", TypeDesc::pointer_to(TypeDesc::Char));
    let b = fx.local("b", TypeDesc::pointer_to(TypeDesc::Char));
    fx.memory.write_addr(a, text).unwrap();
    fx.memory.write_addr(b, text).unwrap();

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    let key = text.to_string();
    let frame = &event.stack_to_render[0];
    assert_eq!(frame.encoded_locals["a"], json!(["REF", key]));
    assert_eq!(frame.encoded_locals["b"], json!(["REF", key]));
    // The string entry plus the null sentinel, nothing duplicated.
    assert_eq!(event.heap.len(), 2);
}

#[test]
fn pointer_encoding() {
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    let x = fx.local("x", TypeDesc::Int);
    fx.memory.write_i32(x, 42).unwrap();
    let p = fx.local("p", TypeDesc::pointer_to(TypeDesc::Int));
    fx.memory.write_addr(p, x).unwrap();
    let q = fx.local("q", TypeDesc::pointer_to(TypeDesc::Char));
    // q stays NULL; a null char* must not be treated as a string.

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    let frame = &event.stack_to_render[0];
    assert_eq!(frame.encoded_locals["p"], json!(["POINTS", x, p]));
    assert_eq!(frame.encoded_locals["q"], json!(["POINTS", 0, q]));
    // The sentinel resolves the null target.
    assert_eq!(event.heap["0"], json!(["NULLPOINTER", "NULL"]));
}

#[test]
fn frame_ids_count_from_the_outermost() {
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    fx.stack.push_frame("helper");

    let event = produce_snapshot(&fx.view(), 12).unwrap().unwrap();
    assert_eq!(event.func_name, "helper");
    assert_eq!(event.stack_to_render.len(), 2);

    let inner = &event.stack_to_render[0];
    assert_eq!(inner.func_name, "helper");
    assert_eq!(inner.frame_id, 1);
    assert_eq!(inner.unique_hash, "helper_1");
    assert!(inner.is_highlighted);
    assert!(!inner.is_parent);
    assert!(!inner.is_zombie);
    assert!(inner.parent_frame_id_list.is_empty());

    let outer = &event.stack_to_render[1];
    assert_eq!(outer.func_name, "main");
    assert_eq!(outer.frame_id, 2);
    assert_eq!(outer.unique_hash, "main_2");
    assert!(!outer.is_highlighted);
}

#[test]
fn unsupported_kinds_are_skipped_not_fatal() {
    let mut fx = Fixture::new();
    fx.global("handler", TypeDesc::Function);
    let g = fx.global("ok", TypeDesc::Int);
    fx.memory.write_i32(g, 1).unwrap();
    fx.stack.push_frame("main");

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    assert_eq!(event.ordered_globals, vec!["ok"]);
    assert!(!event.globals.contains_key("handler"));
}

#[test]
fn non_addressable_entries_are_skipped() {
    let mut fx = Fixture::new();
    fx.globals
        .declare(SymbolEntry::new("MACRO", TypeDesc::Int, 0xbeef).non_addressable());
    fx.stack.push_frame("main");

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    assert!(event.ordered_globals.is_empty());
}

#[test]
fn corrupt_descriptor_aborts_the_snapshot() {
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    // Storage claims to exist at an address no region contains.
    fx.stack
        .innermost_mut()
        .unwrap()
        .locals
        .declare(SymbolEntry::new("ghost", TypeDesc::Int, 0xdead_0000));

    let err = produce_snapshot(&fx.view(), 1).unwrap_err();
    assert!(matches!(err, TraceError::CorruptRuntimeState { .. }));
}

#[test]
fn address_index_labels() {
    let mut fx = Fixture::new();
    let g = fx.global("total", TypeDesc::Int);
    fx.stack.push_frame("main");
    let x = fx.local("x", TypeDesc::Int);

    let index = build_address_index(&fx.view());
    assert_eq!(index.get(&g).map(String::as_str), Some("total"));
    assert_eq!(index.get(&x).map(String::as_str), Some("main.x"));
}

#[test]
fn struct_array_builds_nested_elements() {
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    let ty = TypeDesc::array_of(point_type(), 2);
    let base = fx.local("pts", ty);
    for (i, v) in [1, 2, 3, 4].iter().enumerate() {
        fx.memory.write_i32(base + 4 * i as u64, *v).unwrap();
    }

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    assert_eq!(
        event.heap[&base.to_string()],
        json!([
            "ARRAY",
            [2],
            [
                "STRUCT",
                "Point",
                [],
                ["x", ["ADDR", base, 1]],
                ["y", ["ADDR", base + 4, 2]]
            ],
            [
                "STRUCT",
                "Point",
                [],
                ["x", ["ADDR", base + 8, 3]],
                ["y", ["ADDR", base + 12, 4]]
            ]
        ])
    );
}

#[test]
fn nested_struct_member_refs_back_to_its_parent() {
    // struct Outer { struct Point p; int z; }: the first member shares the
    // outer struct's base address, so its REF resolves to the parent's own
    // heap key instead of spawning a second entry.
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    let ty = TypeDesc::Struct {
        tag: "Outer".to_string(),
        members: vec![
            Member::new("p", point_type()),
            Member::new("z", TypeDesc::Int),
        ],
    };
    let base = fx.local("o", ty);
    fx.memory.write_i32(base, 1).unwrap();
    fx.memory.write_i32(base + 4, 2).unwrap();
    fx.memory.write_i32(base + 8, 9).unwrap();

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    let key = base.to_string();
    assert_eq!(
        event.heap[&key],
        json!([
            "STRUCT",
            "Outer",
            [],
            ["p", ["REF", key]],
            ["z", ["ADDR", base + 8, 9]]
        ])
    );
    // Only the outer entry and the null sentinel exist.
    assert_eq!(event.heap.len(), 2);
}

#[test]
fn array_member_gets_its_own_heap_entry() {
    // struct Buf { int n; int vals[2]; }: the array member sits at a
    // non-zero offset and is framed as [fieldName, REF] pointing at its own
    // heap entry.
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    let ty = TypeDesc::Struct {
        tag: "Buf".to_string(),
        members: vec![
            Member::new("n", TypeDesc::Int),
            Member::new("vals", TypeDesc::array_of(TypeDesc::Int, 2)),
        ],
    };
    let base = fx.local("b", ty);
    fx.memory.write_i32(base, 2).unwrap();
    fx.memory.write_i32(base + 4, 10).unwrap();
    fx.memory.write_i32(base + 8, 20).unwrap();

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    let vals_key = (base + 4).to_string();
    assert_eq!(
        event.heap[&base.to_string()],
        json!([
            "STRUCT",
            "Buf",
            [],
            ["n", ["ADDR", base, 2]],
            ["vals", ["REF", vals_key]]
        ])
    );
    assert_eq!(
        event.heap[&vals_key],
        json!(["ARRAY", [2], ["ADDR", base + 4, 10], ["ADDR", base + 8, 20]])
    );
}

#[test]
fn pointer_array_references_targets() {
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    let x = fx.local("x", TypeDesc::Int);
    let base = fx.local(
        "ptrs",
        TypeDesc::array_of(TypeDesc::pointer_to(TypeDesc::Int), 2),
    );
    fx.memory.write_addr(base, x).unwrap();
    // Second element stays NULL.

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    assert_eq!(
        event.heap[&base.to_string()],
        json!(["ARRAY", [2], ["REF", x.to_string()], ["REF", "0"]])
    );
}

#[test]
fn union_members_share_the_base_address() {
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    let ty = TypeDesc::Union {
        tag: "U".to_string(),
        members: vec![
            Member::new("i", TypeDesc::Int),
            Member::new("c", TypeDesc::Char),
        ],
    };
    let base = fx.local("u", ty);
    fx.memory.write_i32(base, 65).unwrap();

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    assert_eq!(
        event.heap[&base.to_string()],
        json!([
            "UNION",
            "U",
            [],
            ["i", ["ADDR", base, 65]],
            ["c", ["ADDR", base, "A"]]
        ])
    );
}

#[test]
fn floats_encode_as_bare_numbers() {
    let mut fx = Fixture::new();
    let g = fx.global("ratio", TypeDesc::FloatingPoint);
    fx.memory.write_f64(g, 3.5).unwrap();
    fx.stack.push_frame("main");

    let event = produce_snapshot(&fx.view(), 1).unwrap().unwrap();
    assert_eq!(event.globals["ratio"], json!(3.5));
}

#[test]
fn captured_output_is_carried_verbatim() {
    let mut fx = Fixture::new();
    fx.stack.push_frame("main");
    fx.output.print("hello ");
    fx.output.print("world\n");

    let event = produce_snapshot(&fx.view(), 4).unwrap().unwrap();
    assert_eq!(event.stdout, "hello world\n");

    // A view with no output buffer degrades to the empty string.
    let bare = RuntimeView::new(&fx.globals, &fx.stack, &fx.memory);
    let event = produce_snapshot(&bare, 4).unwrap().unwrap();
    assert_eq!(event.stdout, "");
}

#[test]
fn tracer_emits_one_json_line_per_step() {
    let mut fx = Fixture::new();
    let g = fx.global("x", TypeDesc::Int);
    fx.memory.write_i32(g, 5).unwrap();
    fx.stack.push_frame("main");

    let mut tracer = Tracer::new(JsonLinesSink::new(Vec::new()));
    assert!(tracer.step(&fx.view(), 7).unwrap());
    assert!(tracer.step(&fx.view(), 8).unwrap());

    let written = tracer.into_sink().into_inner();
    let text = String::from_utf8(written).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);

    let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["event"], json!("step"));
    assert_eq!(record["line"], json!(7));
    assert_eq!(record["func_name"], json!("main"));
    assert_eq!(record["globals"]["x"], json!(["ADDR", g, 5]));
}
