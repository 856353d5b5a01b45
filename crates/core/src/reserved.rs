//! Reserved words of the language and the host interpreter's built-in symbols.
//!
//! Scramblers never rename a name listed here. The curated [`Builtins::standard`]
//! set covers the core extensions; a full dump of an interpreter installation
//! can be loaded with [`Builtins::from_file`] and merged on top.

use fescate_utils::errors::ConfigError;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Variables the runtime defines or treats specially.
pub const RESERVED_VARIABLES: &[&str] = &[
    "this",
    "php_errormsg",
    "http_response_header",
    "argc",
    "argv",
    "HTTP_RAW_POST_DATA",
    "GLOBALS",
    "_SERVER",
    "_GET",
    "_POST",
    "_FILES",
    "_COOKIE",
    "_SESSION",
    "_ENV",
    "_REQUEST",
];

/// Keywords and language constructs that can never be used as generated names.
pub const RESERVED_KEYWORDS: &[&str] = &[
    "apache_request_headers",
    "class",
    "clone",
    "const",
    "continue",
    "declare",
    "default",
    "die",
    "do",
    "echo",
    "else",
    "elseif",
    "empty",
    "enddeclare",
    "endfor",
    "endforeach",
    "endif",
    "endswitch",
    "endwhile",
    "namespace",
    "new",
    "null",
    "or",
    "print",
    "private",
    "protected",
    "public",
    "require",
    "require_once",
    "implements",
    "include",
    "include_once",
    "instanceof",
    "insteadof",
    "int",
    "interface",
    "isset",
    "list",
    "__halt_compiler",
    "__autoload",
    "abstract",
    "and",
    "array",
    "as",
    "bool",
    "break",
    "callable",
    "case",
    "catch",
    "return",
    "static",
    "string",
    "switch",
    "throw",
    "trait",
    "true",
    "try",
    "unset",
    "use",
    "var",
    "while",
    "xor",
    "yield",
    "eval",
    "exit",
    "extends",
    "false",
    "final",
    "finally",
    "float",
    "for",
    "foreach",
    "function",
    "global",
    "goto",
    "if",
    "fn",
    "match",
    "enum",
    "readonly",
];

/// Names reserved for types and scope resolution.
pub const RESERVED_NAMES: &[&str] = &[
    "parent", "self", "static", "int", "float", "bool", "string", "true", "false", "null", "void",
    "iterable", "object", "resource", "scalar", "mixed", "numeric", "fn", "never",
];

/// Magic methods invoked implicitly by the runtime.
pub const RESERVED_METHODS: &[&str] = &[
    "__construct",
    "__destruct",
    "__call",
    "__callstatic",
    "__get",
    "__set",
    "__isset",
    "__unset",
    "__sleep",
    "__wakeup",
    "__serialize",
    "__unserialize",
    "__tostring",
    "__invoke",
    "__set_state",
    "__clone",
    "__debuginfo",
];

const STANDARD_FUNCTIONS: &[&str] = &[
    // core and function handling
    "func_get_args", "func_get_arg", "func_num_args", "function_exists", "method_exists",
    "property_exists", "class_exists", "interface_exists", "trait_exists", "enum_exists",
    "get_class", "get_parent_class", "get_object_vars", "get_class_methods", "get_called_class",
    "is_a", "is_subclass_of", "call_user_func", "call_user_func_array", "is_callable",
    "define", "defined", "constant", "spl_autoload_register", "spl_object_hash", "spl_object_id",
    "iterator_to_array", "iterator_count", "register_shutdown_function", "set_error_handler",
    "set_exception_handler", "restore_error_handler", "trigger_error", "error_reporting",
    "ini_get", "ini_set", "set_time_limit", "error_log", "debug_backtrace",
    "debug_print_backtrace", "extension_loaded", "php_sapi_name", "phpversion", "php_uname",
    "memory_get_usage", "memory_get_peak_usage", "gc_collect_cycles", "getenv", "putenv",
    "compact", "extract", "settype", "gettype", "get_debug_type",
    // variables
    "isset", "unset", "empty", "is_array", "is_string", "is_int", "is_integer", "is_long",
    "is_float", "is_double", "is_bool", "is_null", "is_numeric", "is_object", "is_scalar",
    "is_iterable", "is_countable", "is_resource", "intval", "floatval", "doubleval", "strval",
    "boolval", "var_dump", "var_export", "print_r", "serialize", "unserialize",
    // strings
    "strlen", "strtolower", "strtoupper", "ucfirst", "lcfirst", "ucwords", "trim", "ltrim",
    "rtrim", "chop", "str_replace", "str_ireplace", "substr", "substr_count", "substr_replace",
    "strpos", "stripos", "strrpos", "strripos", "strstr", "stristr", "strrchr", "str_contains",
    "str_starts_with", "str_ends_with", "str_pad", "str_repeat", "str_split", "strrev",
    "str_word_count", "wordwrap", "nl2br", "htmlspecialchars", "htmlspecialchars_decode",
    "htmlentities", "html_entity_decode", "strip_tags", "addslashes", "stripslashes",
    "quotemeta", "chr", "ord", "explode", "implode", "join", "sprintf", "printf", "vsprintf",
    "vprintf", "fprintf", "sscanf", "number_format", "strcmp", "strcasecmp", "strncmp",
    "strncasecmp", "strnatcmp", "strnatcasecmp", "similar_text", "levenshtein", "soundex",
    "metaphone", "md5", "sha1", "crc32", "hash", "hash_hmac", "hash_algos", "base64_encode",
    "base64_decode", "bin2hex", "hex2bin", "urlencode", "urldecode", "rawurlencode",
    "rawurldecode", "http_build_query", "parse_str", "parse_url", "uniqid", "lcg_value",
    "nl_langinfo", "money_format", "strtr", "chunk_split", "count_chars", "ucwords",
    "mb_strlen", "mb_substr", "mb_strtolower", "mb_strtoupper", "mb_strpos", "mb_str_split",
    "mb_convert_encoding", "mb_internal_encoding", "iconv", "utf8_encode", "utf8_decode",
    "password_hash", "password_verify", "random_bytes", "random_int", "crypt",
    // regular expressions
    "preg_match", "preg_match_all", "preg_replace", "preg_replace_callback", "preg_split",
    "preg_quote", "preg_grep", "preg_last_error",
    // arrays
    "array", "count", "sizeof", "in_array", "array_search", "array_keys", "array_values",
    "array_merge", "array_merge_recursive", "array_combine", "array_flip", "array_slice",
    "array_splice", "array_map", "array_filter", "array_reduce", "array_walk",
    "array_walk_recursive", "array_key_exists", "key_exists", "array_key_first",
    "array_key_last", "array_push", "array_pop", "array_shift", "array_unshift",
    "array_reverse", "array_unique", "array_diff", "array_diff_key", "array_diff_assoc",
    "array_intersect", "array_intersect_key", "array_fill", "array_fill_keys", "array_pad",
    "array_chunk", "array_column", "array_sum", "array_product", "array_rand",
    "array_count_values", "array_replace", "array_is_list", "range", "sort", "rsort", "usort",
    "uasort", "uksort", "asort", "arsort", "ksort", "krsort", "natsort", "natcasesort",
    "shuffle", "current", "key", "next", "prev", "reset", "end", "each", "list",
    // math
    "abs", "ceil", "floor", "round", "sqrt", "pow", "exp", "log", "log10", "log2", "sin",
    "cos", "tan", "asin", "acos", "atan", "atan2", "pi", "fmod", "intdiv", "max", "min",
    "rand", "mt_rand", "mt_srand", "srand", "mt_getrandmax", "getrandmax", "is_nan",
    "is_finite", "is_infinite", "base_convert", "bindec", "decbin", "hexdec", "dechex",
    "octdec", "decoct", "deg2rad", "rad2deg", "hypot",
    // json
    "json_encode", "json_decode", "json_last_error", "json_last_error_msg",
    // date and time
    "time", "microtime", "hrtime", "date", "gmdate", "mktime", "gmmktime", "strtotime",
    "checkdate", "date_default_timezone_set", "date_default_timezone_get", "sleep", "usleep",
    "strftime", "date_create", "date_diff",
    // files and streams
    "file_exists", "file_get_contents", "file_put_contents", "file", "fopen", "fclose",
    "fread", "fwrite", "fputs", "fgets", "fgetc", "feof", "fflush", "fseek", "ftell",
    "rewind", "ftruncate", "flock", "fputcsv", "fgetcsv", "is_file", "is_dir", "is_link",
    "is_readable", "is_writable", "is_writeable", "is_executable", "mkdir", "rmdir",
    "unlink", "rename", "copy", "touch", "chmod", "chown", "chgrp", "filemtime", "filesize",
    "fileperms", "stat", "lstat", "realpath", "basename", "dirname", "pathinfo", "glob",
    "scandir", "opendir", "readdir", "closedir", "rewinddir", "tempnam", "tmpfile",
    "sys_get_temp_dir", "getcwd", "chdir", "readfile", "fpassthru", "stream_get_contents",
    "stream_context_create", "symlink", "readlink", "clearstatcache", "disk_free_space",
    // output and http
    "ob_start", "ob_get_clean", "ob_get_contents", "ob_end_clean", "ob_end_flush", "flush",
    "header", "headers_sent", "setcookie", "http_response_code", "session_start",
    "session_destroy", "session_id", "session_regenerate_id",
    // process
    "exec", "shell_exec", "system", "passthru", "proc_open", "proc_close", "escapeshellarg",
    "escapeshellcmd", "getmypid", "gethostname",
    // filters and misc
    "filter_var", "filter_input", "version_compare", "highlight_string", "php_strip_whitespace",
    "token_get_all", "array_key_exists", "mail", "curl_init", "curl_setopt", "curl_exec",
    "curl_close", "curl_error", "curl_getinfo",
];

const STANDARD_CONSTANTS: &[&str] = &[
    "TRUE", "FALSE", "NULL", "PHP_EOL", "PHP_VERSION", "PHP_MAJOR_VERSION", "PHP_MINOR_VERSION",
    "PHP_INT_MAX", "PHP_INT_MIN", "PHP_INT_SIZE", "PHP_FLOAT_EPSILON", "PHP_FLOAT_MAX",
    "PHP_FLOAT_MIN", "PHP_OS", "PHP_OS_FAMILY", "PHP_SAPI", "DIRECTORY_SEPARATOR",
    "PATH_SEPARATOR", "E_ALL", "E_ERROR", "E_WARNING", "E_PARSE", "E_NOTICE", "E_STRICT",
    "E_DEPRECATED", "E_USER_ERROR", "E_USER_WARNING", "E_USER_NOTICE", "E_USER_DEPRECATED",
    "M_PI", "M_E", "M_SQRT2", "INF", "NAN", "SORT_REGULAR", "SORT_NUMERIC", "SORT_STRING",
    "SORT_FLAG_CASE", "SORT_NATURAL", "COUNT_RECURSIVE", "JSON_PRETTY_PRINT",
    "JSON_UNESCAPED_SLASHES", "JSON_UNESCAPED_UNICODE", "JSON_THROW_ON_ERROR",
    "JSON_ERROR_NONE", "JSON_HEX_TAG", "JSON_NUMERIC_CHECK", "ENT_QUOTES", "ENT_COMPAT",
    "ENT_HTML5", "ENT_NOQUOTES", "FILE_APPEND", "FILE_IGNORE_NEW_LINES", "FILE_SKIP_EMPTY_LINES",
    "LOCK_EX", "LOCK_SH", "LOCK_UN", "PREG_SPLIT_NO_EMPTY", "PREG_PATTERN_ORDER",
    "PREG_SET_ORDER", "PREG_OFFSET_CAPTURE", "ARRAY_FILTER_USE_KEY", "ARRAY_FILTER_USE_BOTH",
    "STR_PAD_LEFT", "STR_PAD_RIGHT", "STR_PAD_BOTH", "PHP_ROUND_HALF_UP", "PHP_ROUND_HALF_DOWN",
    "SEEK_SET", "SEEK_CUR", "SEEK_END", "STDIN", "STDOUT", "STDERR", "LC_ALL", "LC_NUMERIC",
    "FILTER_VALIDATE_INT", "FILTER_VALIDATE_EMAIL", "FILTER_VALIDATE_URL",
    "FILTER_VALIDATE_BOOLEAN", "FILTER_DEFAULT", "CURLOPT_URL", "CURLOPT_RETURNTRANSFER",
    "CURLOPT_POST", "CURLOPT_POSTFIELDS", "CURLOPT_HTTPHEADER", "CURLOPT_TIMEOUT",
];

type ClassEntry = (&'static str, &'static [&'static str], &'static [&'static str], &'static [&'static str]);

/// `(class, methods, properties, constants)`
const STANDARD_CLASSES: &[ClassEntry] = &[
    ("stdClass", &[], &[], &[]),
    ("Closure", &["bind", "bindTo", "call", "fromCallable"], &[], &[]),
    ("Generator", &["current", "key", "next", "rewind", "send", "throw", "valid", "getReturn"], &[], &[]),
    ("Throwable", &["getMessage", "getCode", "getFile", "getLine", "getTrace", "getTraceAsString", "getPrevious", "__toString"], &[], &[]),
    ("Exception", &["getMessage", "getCode", "getFile", "getLine", "getTrace", "getTraceAsString", "getPrevious", "__toString"], &["message", "code", "file", "line", "previous"], &[]),
    ("ErrorException", &["getSeverity"], &["severity"], &[]),
    ("Error", &["getMessage", "getCode", "getFile", "getLine", "getTrace", "getTraceAsString", "getPrevious", "__toString"], &["message", "code", "file", "line", "previous"], &[]),
    ("TypeError", &[], &[], &[]),
    ("ValueError", &[], &[], &[]),
    ("ArithmeticError", &[], &[], &[]),
    ("DivisionByZeroError", &[], &[], &[]),
    ("ArgumentCountError", &[], &[], &[]),
    ("JsonException", &[], &[], &[]),
    ("LogicException", &[], &[], &[]),
    ("BadFunctionCallException", &[], &[], &[]),
    ("BadMethodCallException", &[], &[], &[]),
    ("DomainException", &[], &[], &[]),
    ("InvalidArgumentException", &[], &[], &[]),
    ("LengthException", &[], &[], &[]),
    ("OutOfRangeException", &[], &[], &[]),
    ("RuntimeException", &[], &[], &[]),
    ("OutOfBoundsException", &[], &[], &[]),
    ("OverflowException", &[], &[], &[]),
    ("RangeException", &[], &[], &[]),
    ("UnderflowException", &[], &[], &[]),
    ("UnexpectedValueException", &[], &[], &[]),
    ("Traversable", &[], &[], &[]),
    ("Iterator", &["current", "key", "next", "rewind", "valid"], &[], &[]),
    ("IteratorAggregate", &["getIterator"], &[], &[]),
    ("ArrayAccess", &["offsetExists", "offsetGet", "offsetSet", "offsetUnset"], &[], &[]),
    ("Countable", &["count"], &[], &[]),
    ("Serializable", &["serialize", "unserialize"], &[], &[]),
    ("Stringable", &["__toString"], &[], &[]),
    ("JsonSerializable", &["jsonSerialize"], &[], &[]),
    ("UnitEnum", &["cases"], &["name"], &[]),
    ("BackedEnum", &["from", "tryFrom"], &["value"], &[]),
    ("Attribute", &[], &["flags"], &["TARGET_CLASS", "TARGET_FUNCTION", "TARGET_METHOD", "TARGET_PROPERTY", "TARGET_CLASS_CONSTANT", "TARGET_PARAMETER", "TARGET_ALL", "IS_REPEATABLE"]),
    ("ArrayObject", &["append", "getArrayCopy", "count", "getIterator", "offsetExists", "offsetGet", "offsetSet", "offsetUnset", "exchangeArray", "setFlags", "getFlags"], &[], &["STD_PROP_LIST", "ARRAY_AS_PROPS"]),
    ("ArrayIterator", &["current", "key", "next", "rewind", "valid", "count", "getArrayCopy"], &[], &[]),
    ("SplStack", &["push", "pop", "top", "isEmpty", "count"], &[], &[]),
    ("SplQueue", &["enqueue", "dequeue", "push", "shift", "isEmpty", "count"], &[], &[]),
    ("SplObjectStorage", &["attach", "detach", "contains", "count", "getInfo", "setInfo"], &[], &[]),
    ("SplFixedArray", &["toArray", "getSize", "setSize", "fromArray"], &[], &[]),
    ("SplPriorityQueue", &["insert", "extract", "top", "isEmpty", "count"], &[], &[]),
    ("SplFileInfo", &["getFilename", "getPath", "getPathname", "getExtension", "getBasename", "getSize", "getMTime", "isDir", "isFile", "getRealPath", "openFile"], &[], &[]),
    ("SplFileObject", &["fgets", "fwrite", "eof", "current", "key", "next", "rewind", "valid"], &[], &["DROP_NEW_LINE", "READ_AHEAD", "SKIP_EMPTY", "READ_CSV"]),
    ("DirectoryIterator", &["isDot", "getFilename", "getPathname"], &[], &[]),
    ("FilesystemIterator", &[], &[], &["SKIP_DOTS", "CURRENT_AS_PATHNAME", "KEY_AS_FILENAME"]),
    ("RecursiveDirectoryIterator", &["getSubPathname", "hasChildren", "getChildren"], &[], &[]),
    ("RecursiveIteratorIterator", &["getDepth", "getSubIterator"], &[], &["LEAVES_ONLY", "SELF_FIRST", "CHILD_FIRST"]),
    ("DateTimeInterface", &["format", "getTimestamp", "getTimezone", "diff", "getOffset"], &[], &["ATOM", "COOKIE", "ISO8601", "RFC822", "RFC850", "RFC1036", "RFC1123", "RFC2822", "RFC3339", "RSS", "W3C"]),
    ("DateTime", &["format", "modify", "getTimestamp", "setTimestamp", "setTimezone", "getTimezone", "setDate", "setTime", "add", "sub", "diff", "createFromFormat"], &[], &["ATOM", "COOKIE", "ISO8601", "RFC822", "RFC2822", "RFC3339", "RSS", "W3C"]),
    ("DateTimeImmutable", &["format", "modify", "getTimestamp", "setTimestamp", "setTimezone", "getTimezone", "setDate", "setTime", "add", "sub", "diff", "createFromFormat", "createFromMutable"], &[], &["ATOM", "ISO8601", "RFC2822", "RFC3339", "W3C"]),
    ("DateTimeZone", &["getName", "getOffset"], &[], &["UTC", "EUROPE", "AMERICA"]),
    ("DateInterval", &["format"], &["y", "m", "d", "h", "i", "s", "f", "invert", "days"], &[]),
    ("DatePeriod", &["getStartDate", "getEndDate"], &[], &["EXCLUDE_START_DATE"]),
    ("PDO", &["prepare", "query", "exec", "lastInsertId", "beginTransaction", "commit", "rollBack", "inTransaction", "setAttribute", "getAttribute", "quote", "errorCode", "errorInfo"], &[], &["PARAM_INT", "PARAM_STR", "PARAM_BOOL", "PARAM_NULL", "FETCH_ASSOC", "FETCH_NUM", "FETCH_BOTH", "FETCH_OBJ", "FETCH_CLASS", "FETCH_COLUMN", "ATTR_ERRMODE", "ERRMODE_EXCEPTION", "ATTR_DEFAULT_FETCH_MODE", "ATTR_EMULATE_PREPARES"]),
    ("PDOStatement", &["execute", "fetch", "fetchAll", "fetchColumn", "fetchObject", "bindParam", "bindValue", "rowCount", "columnCount", "closeCursor", "setFetchMode", "errorInfo"], &["queryString"], &[]),
    ("PDOException", &[], &["errorInfo"], &[]),
    ("ReflectionClass", &["getName", "getShortName", "getMethods", "getMethod", "getProperties", "getProperty", "hasMethod", "hasProperty", "newInstance", "newInstanceArgs", "newInstanceWithoutConstructor", "getDocComment", "getAttributes", "isInstance", "getParentClass", "implementsInterface", "getConstants"], &["name"], &[]),
    ("ReflectionMethod", &["invoke", "invokeArgs", "setAccessible", "getName", "getDocComment", "getParameters", "isPublic", "isStatic"], &["name", "class"], &[]),
    ("ReflectionProperty", &["getValue", "setValue", "setAccessible", "getName", "getDocComment"], &["name", "class"], &[]),
    ("ReflectionFunction", &["invoke", "invokeArgs", "getName", "getParameters"], &["name"], &[]),
    ("ReflectionObject", &[], &[], &[]),
    ("ReflectionException", &[], &[], &[]),
    ("WeakMap", &["count", "offsetGet", "offsetSet"], &[], &[]),
    ("WeakReference", &["create", "get"], &[], &[]),
    ("SimpleXMLElement", &["asXML", "attributes", "children", "addChild", "addAttribute", "xpath", "getName"], &[], &[]),
    ("DOMDocument", &["loadHTML", "loadXML", "saveHTML", "saveXML", "createElement", "getElementById", "getElementsByTagName", "appendChild"], &["documentElement"], &[]),
    ("DOMXPath", &["query", "evaluate"], &[], &[]),
];

/// A built-in class with its member names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuiltinClass {
    pub methods: Vec<String>,
    pub properties: Vec<String>,
    pub constants: Vec<String>,
}

/// Symbols defined by the host interpreter.
///
/// Function, class and method names are stored lowercased since the language
/// resolves them case-insensitively. Constants and properties keep their case.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Builtins {
    pub functions: BTreeSet<String>,
    pub constants: BTreeSet<String>,
    pub classes: BTreeMap<String, BuiltinClass>,
}

impl Builtins {
    /// The curated set shipped with the tool.
    pub fn standard() -> Self {
        let mut builtins = Self {
            functions: STANDARD_FUNCTIONS.iter().map(|f| f.to_string()).collect(),
            constants: STANDARD_CONSTANTS.iter().map(|c| c.to_string()).collect(),
            classes: BTreeMap::new(),
        };
        for (name, methods, properties, constants) in STANDARD_CLASSES {
            builtins.classes.insert(
                name.to_string(),
                BuiltinClass {
                    methods: methods.iter().map(|m| m.to_string()).collect(),
                    properties: properties.iter().map(|p| p.to_string()).collect(),
                    constants: constants.iter().map(|c| c.to_string()).collect(),
                },
            );
        }
        builtins.normalize()
    }

    /// Load a JSON dump of the form
    /// `{"functions": [...], "constants": [...], "classes": {"Name": {"methods": [...]}}}`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(parsed.normalize())
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.functions.extend(other.functions);
        self.constants.extend(other.constants);
        for (name, class) in other.classes {
            let entry = self.classes.entry(name).or_default();
            entry.methods.extend(class.methods);
            entry.properties.extend(class.properties);
            entry.constants.extend(class.constants);
        }
        self
    }

    fn normalize(self) -> Self {
        Self {
            functions: self.functions.iter().map(|f| f.to_ascii_lowercase()).collect(),
            constants: self.constants,
            classes: self
                .classes
                .into_iter()
                .map(|(name, class)| {
                    let methods = class.methods.iter().map(|m| m.to_ascii_lowercase()).collect();
                    (
                        name.to_ascii_lowercase(),
                        BuiltinClass {
                            methods,
                            ..class
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains(&name.to_ascii_lowercase())
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.classes.contains_key(&name.to_ascii_lowercase())
    }

    pub fn class(&self, name: &str) -> Option<&BuiltinClass> {
        self.classes.get(&name.to_ascii_lowercase())
    }
}
