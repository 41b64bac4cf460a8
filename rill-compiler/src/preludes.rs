//! Keyed catalog of Go helper snippets inlined into the emitted program,
//! plus the imports each snippet needs. The emitter requests snippets by
//! key; an unknown key is a compiler bug, not user error.

pub fn code(name: &str) -> &'static str {
    match name {
        // The Itoa coercion needs no helper body, only the strconv import.
        "intToString" => "",
        "stringToInt" => {
            r#"
func __stringToInt(s string) int {
    i, err := strconv.Atoi(s)
    if err != nil {
        fmt.Fprintf(os.Stderr, "Runtime error: string %q cannot be converted to integer\n", s)
        os.Exit(99)
    }
    return i
}
"#
        }
        "stringToFloat" => {
            r#"
func __stringToFloat(s string) float64 {
    f, err := strconv.ParseFloat(s, 64)
    if err != nil {
        fmt.Fprintf(os.Stderr, "Runtime error: string %q cannot be converted to float\n", s)
        os.Exit(99)
    }
    return f
}
"#
        }
        "parseInt" => {
            r#"
func __parseInt(s string) (int, error) {
    return strconv.Atoi(s)
}
"#
        }
        "parseFloat" => {
            r#"
func __parseFloat(s string) (float64, error) {
    return strconv.ParseFloat(s, 64)
}
"#
        }
        "createRange" => {
            r#"
func __createRange(from int, to int) []int {
    r := make([]int, 0, to-from+1)
    for i := from; i <= to; i++ {
        r = append(r, i)
    }
    return r
}
"#
        }
        "joinIntSlice" => {
            r#"
func __joinIntSlice(list []int, sep string) string {
    parts := make([]string, 0, len(list))
    for _, v := range list {
        parts = append(parts, strconv.Itoa(v))
    }
    return strings.Join(parts, sep)
}
"#
        }
        "joinFloatSlice" => {
            r#"
func __joinFloatSlice(list []float64, sep string) string {
    parts := make([]string, 0, len(list))
    for _, v := range list {
        parts = append(parts, strconv.FormatFloat(v, 'f', -1, 64))
    }
    return strings.Join(parts, sep)
}
"#
        }
        "handleNonPropagatableError" => {
            r#"
func __handleNonPropagatableError(err error) {
    if err == nil {
        return
    }
    fmt.Fprintln(os.Stderr, err)
    os.Exit(1)
}
"#
        }
        "regexMatch" => {
            r#"
func __regexMatch(haystack string, pattern string) bool {
    re, err := regexp.Compile(pattern)
    if err != nil {
        return false
    }
    return re.MatchString(haystack)
}
"#
        }
        "regexCapture" => {
            r#"
func __regexCapture(haystack string, pattern string) []string {
    re, err := regexp.Compile(pattern)
    if err != nil {
        return []string{}
    }
    m := re.FindStringSubmatch(haystack)
    if len(m) < 2 {
        return []string{}
    }
    return m[1:]
}
"#
        }
        "regexFind" => {
            r#"
func __regexFind(haystack string, pattern string) []string {
    re, err := regexp.Compile(pattern)
    if err != nil {
        return []string{}
    }
    m := re.FindAllString(haystack, -1)
    if m == nil {
        return []string{}
    }
    return m
}
"#
        }
        "slurpFile" => {
            r#"
func __slurpFile(path string) string {
    data, err := os.ReadFile(path)
    if err != nil {
        fmt.Fprintf(os.Stderr, "Runtime error: cannot read file %q\n", path)
        os.Exit(99)
    }
    return string(data)
}
"#
        }
        "makeSet" => {
            r#"
func __makeSet[T comparable](items ...T) map[T]struct{} {
    set := make(map[T]struct{}, len(items))
    for _, item := range items {
        set[item] = struct{}{}
    }
    return set
}
"#
        }
        "setContains" => {
            r#"
func __setContains[T comparable](set map[T]struct{}, value T) bool {
    _, ok := set[value]
    return ok
}
"#
        }
        "setDelete" => {
            r#"
func __setDelete[T comparable](set map[T]struct{}, value T) bool {
    _, ok := set[value]
    delete(set, value)
    return ok
}
"#
        }
        "setUnion" => {
            r#"
func __setUnion[T comparable](a map[T]struct{}, b map[T]struct{}) map[T]struct{} {
    union := make(map[T]struct{}, len(a)+len(b))
    for k := range a {
        union[k] = struct{}{}
    }
    for k := range b {
        union[k] = struct{}{}
    }
    return union
}
"#
        }
        _ => unreachable!("unknown prelude {:?}", name),
    }
}

pub fn imports(name: &str) -> &'static [&'static str] {
    match name {
        "intToString" => &["strconv"],
        "stringToInt" | "stringToFloat" => &["fmt", "os", "strconv"],
        "parseInt" | "parseFloat" => &["strconv"],
        "createRange" => &[],
        "joinIntSlice" | "joinFloatSlice" => &["strconv", "strings"],
        "handleNonPropagatableError" => &["fmt", "os"],
        "regexMatch" | "regexCapture" | "regexFind" => &["regexp"],
        "slurpFile" => &["fmt", "os"],
        "makeSet" | "setContains" | "setDelete" | "setUnion" => &[],
        _ => unreachable!("unknown prelude {:?}", name),
    }
}
