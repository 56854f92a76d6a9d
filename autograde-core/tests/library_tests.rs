//! Library classes as submitted code sees them

mod common;
use autograde_core::Raised;
use common::{main_body, output_of, run_main};

#[test]
fn test_string_methods() {
    let output = output_of(&main_body(
        r#"
        String s = "  Hello, World  ";
        String t = s.trim();
        System.out.println(t.length());
        System.out.println(t.toUpperCase());
        System.out.println(t.substring(7));
        System.out.println(t.indexOf("World") + " " + t.indexOf('z'));
        System.out.println(t.charAt(4));
        System.out.println(t.replace("World", "There"));
        System.out.println(t.startsWith("Hell") && t.endsWith("d"));
        System.out.println("abc".compareTo("abd"));
        System.out.println("Yes".equalsIgnoreCase("yES"));
        String[] parts = "a, b,c".split(",\\s*");
        System.out.println(parts.length + parts[1]);
        char[] cs = "xyz".toCharArray();
        System.out.println(cs.length);
        System.out.println(String.valueOf(12) + String.join("-", "a", "b"));
        "#,
    ));
    assert_eq!(
        output,
        "12\nHELLO, WORLD\nWorld\n7 -1\no\nHello, There\ntrue\n-1\ntrue\n3b\n3\n12a-b\n"
    );
}

#[test]
fn test_string_index_fault() {
    let run = run_main(&main_body(r#"System.out.println("abc".charAt(5));"#), &[]);
    assert_eq!(run.exception().as_deref(), Some("StringIndexOutOfBoundsException"));
}

#[test]
fn test_format_and_printf() {
    let output = output_of(&main_body(
        r#"
        System.out.println(String.format("%.2f", 3.14159));
        System.out.printf("%5d|%-5s|%n", 42, "ab");
        System.out.printf("%05.1f %s %b%n", 2.25, 'c', true);
        System.out.println(String.format("%,d", 1234567));
        "#,
    ));
    assert_eq!(output, "3.14\n   42|ab   |\n002.3 c true\n1,234,567\n");
}

#[test]
fn test_format_conversion_mismatch() {
    let run = run_main(&main_body(r#"System.out.printf("%d", "text");"#), &[]);
    assert_eq!(run.exception().as_deref(), Some("IllegalFormatConversionException"));
}

#[test]
fn test_string_builder() {
    let output = output_of(&main_body(
        r#"
        StringBuilder sb = new StringBuilder();
        sb.append("ab").append(1).append('c');
        System.out.println(sb.toString() + " " + sb.length());
        sb.reverse();
        System.out.println(sb);
        sb.insert(0, "<").deleteCharAt(1);
        System.out.println(sb);
        "#,
    ));
    assert_eq!(output, "ab1c 4\nc1ba\n<1ba\n");
}

#[test]
fn test_array_list() {
    let output = output_of(&main_body(
        r#"
        ArrayList<Integer> xs = new ArrayList<>();
        xs.add(3);
        xs.add(1);
        xs.add(2);
        System.out.println(xs + " " + xs.size());
        xs.remove(0);
        System.out.println(xs.get(0) + xs.get(1));
        System.out.println(xs.contains(2) + " " + xs.indexOf(7));
        int total = 0;
        for (int x : xs) { total += x; }
        System.out.println(total);
        List<String> names = new ArrayList<>();
        names.add("b");
        names.add("a");
        Collections.sort(names);
        System.out.println(names);
        "#,
    ));
    assert_eq!(output, "[3, 1, 2] 3\n3\ntrue -1\n3\n[a, b]\n");
}

#[test]
fn test_list_index_fault() {
    let run = run_main(
        &main_body("ArrayList<String> xs = new ArrayList<>(); xs.get(0);"),
        &[],
    );
    let Err(Raised::Exception(t)) = &run.result else {
        panic!("expected exception");
    };
    assert_eq!(t.class, "IndexOutOfBoundsException");
    assert_eq!(t.message.as_deref(), Some("Index 0 out of bounds for length 0"));
}

#[test]
fn test_arrays_helpers() {
    let output = output_of(&main_body(
        r#"
        int[] xs = {5, 2, 9, 1};
        Arrays.sort(xs);
        System.out.println(Arrays.toString(xs));
        int[] ys = Arrays.copyOf(xs, 6);
        System.out.println(Arrays.toString(ys));
        int[][] grid = new int[2][3];
        grid[1][2] = 7;
        System.out.println(Arrays.deepToString(grid));
        "#,
    ));
    assert_eq!(output, "[1, 2, 5, 9]\n[1, 2, 5, 9, 0, 0]\n[[0, 0, 0], [0, 0, 7]]\n");
}

#[test]
fn test_math_and_wrappers() {
    let output = output_of(&main_body(
        r#"
        System.out.println(Math.max(3, 8) + " " + Math.abs(-2.5) + " " + Math.pow(2, 10));
        System.out.println(Math.sqrt(16) + " " + Math.round(2.5) + " " + Math.round(-2.5));
        System.out.println(Math.floor(-1.1) + " " + Math.ceil(1.1));
        System.out.println(Integer.parseInt("-42") + 1);
        System.out.println(Double.parseDouble("1.5") * 2);
        System.out.println(Integer.MIN_VALUE);
        "#,
    ));
    assert_eq!(
        output,
        "8 2.5 1024.0\n4.0 3 -2\n-2.0 2.0\n-41\n3.0\n-2147483648\n"
    );
}

#[test]
fn test_parse_int_failure() {
    let run = run_main(&main_body(r#"Integer.parseInt("12x");"#), &[]);
    let Err(Raised::Exception(t)) = &run.result else {
        panic!("expected exception");
    };
    assert_eq!(t.class, "NumberFormatException");
    assert_eq!(t.message.as_deref(), Some("For input string: \"12x\""));
}

// ===== Scanner =====

#[test]
fn test_scanner_tokens_and_lines() {
    let source = main_body(
        r#"
        Scanner in = new Scanner(System.in);
        int n = in.nextInt();
        in.nextLine();
        String name = in.nextLine();
        int sum = 0;
        for (int i = 0; i < n; i++) { sum += in.nextInt(); }
        System.out.println(name + ":" + sum);
        System.out.println(in.hasNext());
        "#,
    );
    let run = run_main(&source, &["3", "Ada Lovelace", "1 2", "  3  "]);
    assert_eq!(run.result, Ok(autograde_core::Value::Void));
    assert_eq!(run.output, "Ada Lovelace:6\nfalse\n");
}

#[test]
fn test_reading_past_input_is_exhaustion() {
    let source = main_body(
        r#"
        Scanner in = new Scanner(System.in);
        System.out.println("got " + in.nextLine());
        System.out.println("got " + in.nextLine());
        System.out.println("got " + in.nextLine());
        "#,
    );
    let run = run_main(&source, &["one", "two"]);
    assert_eq!(run.result, Err(Raised::InputExhausted));
    assert_eq!(run.output, "got one\ngot two\n");
}

#[test]
fn test_scanner_mismatch_is_catchable() {
    let source = main_body(
        r#"
        Scanner in = new Scanner(System.in);
        try {
            in.nextInt();
        } catch (InputMismatchException e) {
            System.out.println("not a number: " + in.next());
        }
        "#,
    );
    let run = run_main(&source, &["abc"]);
    assert_eq!(run.output, "not a number: abc\n");
}

#[test]
fn test_scanner_radix_out_of_range_is_a_fault() {
    let source = main_body(
        r#"
        Scanner in = new Scanner(System.in);
        System.out.println(in.nextInt(16));
        in.nextInt(1);
        "#,
    );
    let run = run_main(&source, &["ff", "5"]);
    assert_eq!(run.output, "255\n");
    let Err(Raised::Exception(t)) = &run.result else {
        panic!("expected exception, got {:?}", run.result);
    };
    assert_eq!(t.class, "NumberFormatException");
    assert_eq!(t.message.as_deref(), Some("radix 1 less than Character.MIN_RADIX"));

    let source = main_body("new Scanner(System.in).nextInt(-3);");
    let run = run_main(&source, &["5"]);
    assert_eq!(run.exception().as_deref(), Some("NumberFormatException"));

    let source = main_body("Integer.parseInt(\"7\", 37);");
    let run = run_main(&source, &[]);
    let Err(Raised::Exception(t)) = &run.result else {
        panic!("expected exception, got {:?}", run.result);
    };
    assert_eq!(t.message.as_deref(), Some("radix 37 greater than Character.MAX_RADIX"));
}

#[test]
fn test_has_next_loops_stop_at_end_of_input() {
    let source = main_body(
        r#"
        Scanner in = new Scanner(System.in);
        int lines = 0;
        while (in.hasNextLine()) { in.nextLine(); lines++; }
        int sum = 0;
        while (in.hasNextInt()) { sum += in.nextInt(); }
        System.out.println(lines + " " + sum + " " + in.hasNext());
        "#,
    );
    let run = run_main(&source, &["a", "b"]);
    assert_eq!(run.result, Ok(autograde_core::Value::Void));
    assert_eq!(run.output, "2 0 false\n");
}
