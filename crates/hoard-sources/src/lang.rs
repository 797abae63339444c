//! Canonical spelling of programming-language names.
//!
//! GHTorrent lowercases language names (`viml`, `objective-c`); the catalogue
//! stores the spelling the hosting service displays (`VimL`, `Objective-C`).

/// Known language names, sorted case-insensitively.
const KNOWN: &[&str] = &[
  "ABAP", "ABC", "ActionScript", "Ada", "Agda", "AgilentVEE", "AGS Script",
  "Algol", "Alice", "Alloy", "AMPL", "Angelscript", "Ant Build System", "ANTLR",
  "ApacheConf", "Apex", "API Blueprint", "APL", "AppleScript", "Arc", "Arduino",
  "AsciiDoc", "ASP", "AspectJ", "Assembly", "ATLAS", "ATS", "Augeas",
  "AutoHotkey", "AutoIt", "AutoLISP", "Automator", "Avenue", "Awk", "Bash",
  "BASIC", "Batchfile", "bc", "BCPL", "BeanShell", "Befunge", "BETA", "Bison",
  "BitBake", "BlitzBasic", "BlitzMax", "Bluespec", "Boo", "BourneShell",
  "Brainfuck", "Brightscript", "Bro", "C", "C#", "C++", "C-ObjDump",
  "C2hs Haskell", "Caml", "Cap'n Proto", "CartoCSS",
  "Ceylon", "CFML", "cg", "Ch", "Chapel", "Charity", "Chef", "CHILL", "ChucK",
  "CIL", "Cirru", "Clarion", "Clean", "Clipper", "CLIPS", "Clojure", "CLU",
  "CMake", "COBOL", "Cobra", "CoffeeScript", "ColdFusion", "ColdFusion CFC",
  "COMAL", "COmega", "Common Lisp", "Component Pascal", "Cool", "Coq", "CPL",
  "Cpp-ObjDump", "Creole", "Crystal", "CShell", "CSS", "cT", "Cucumber", "Cuda",
  "Curl", "Cycript", "Cython", "D", "D-ObjDump", "Darcs Patch", "Dart", "dBase",
  "DCL", "DCPU-16 ASM", "DCPU16ASM", "Delphi", "desktop", "DiBOL", "Diff",
  "DIGITAL Command Language", "DM", "DNS Zone", "Dockerfile", "Dogescript",
  "DOT", "DTrace", "Dylan", "E", "Eagle", "eC", "Ecere Projects", "ECL",
  "ECLiPSe", "ECMAScript", "edn", "EGL", "Eiffel", "Elixir", "Elm",
  "Emacs Lisp", "EmberScript", "EPL", "Erlang", "Escher", "Etoys", "Euclid",
  "Euphoria", "EXEC", "F#", "Factor", "Falcon", "Fancy", "Fantom", "Felix",
  "Filterscript", "fish", "FLUX", "Formatted", "Forth", "FORTRAN", "Fortress",
  "FourthDimension 4D", "FreeMarker", "Frege", "G-code", "Gambas",
  "Game Maker Language", "GAMS", "GAP", "GAS", "GDScript", "Genshi",
  "Gentoo Ebuild", "Gentoo Eclass", "Gettext Catalog", "GLSL", "Glyph",
  "GNU Octave", "Gnuplot", "Go", "Golo", "GoogleAppsScript", "Gosu", "Grace",
  "Gradle", "Grammatical Framework", "Graph Modeling Language",
  "Graphviz (DOT)", "Groff", "Groovy", "Groovy Server Pages", "Hack", "Haml",
  "Handlebars", "Harbour", "Haskell", "Haxe", "HCL", "Heron", "HPL", "HTML",
  "HTML+Django", "HTML+EEX", "HTML+ERB", "HTML+PHP", "HTTP", "Hy", "HyperTalk",
  "HyPhy", "Icon", "IDL", "Idris", "IGOR Pro", "Inform", "Inform 7",
  "Informix 4GL", "INI", "Inno Setup", "INTERCAL", "Io", "Ioke", "IRC log",
  "Isabelle", "Isabelle ROOT", "J", "J#", "JADE", "Jasmin", "Java",
  "Java Server Pages", "JavaFXScript", "JavaScript", "JFlex", "JScript",
  "JScript.NET", "JSON", "JSON5", "JSONiq", "JSONLD", "JSX", "Julia",
  "Jupyter Notebook", "KiCad", "Kit", "KornShell", "Kotlin", "KRL", "ksh",
  "LabVIEW", "LadderLogic", "Lasso", "LaTeX", "Latte", "Lean", "Less", "Lex",
  "LFE", "LilyPond", "Limbo", "Lingo", "Linker Script", "Linux Kernel Module",
  "Liquid", "Lisp", "Literate Agda", "Literate CoffeeScript",
  "Literate Haskell", "LiveScript", "LLVM", "Logo", "Logos", "Logtalk",
  "LOLCODE", "LookML", "LoomScript", "LotusScript", "LPC", "LSL", "Lua",
  "Lucid", "Lustre", "M", "M4", "MAD", "Magic", "Magik", "Makefile", "Mako",
  "Malbolge", "MANTIS", "Maple", "Markdown", "Mask", "Mathematica", "Matlab",
  "Maven POM", "Max", "MaxMSP", "MAXScript", "MDL", "MediaWiki", "MEL",
  "Mercury", "Metal", "MiniD", "Mirah", "Miva", "ML", "Modelica", "Modula-2",
  "Modula-3", "Module Management System", "Monkey", "MOO", "Moocode",
  "MoonScript", "Moto", "MSDOSBatch", "MTML", "MUF", "MUMPS", "mupad", "Myghty",
  "NATURAL", "NCL", "Nemerle", "nesC", "NetLinx", "NetLinx+ERB", "NetLogo",
  "NewLisp", "Nginx", "Nimrod", "Ninja", "Nit", "Nix", "NL", "NQC", "NSIS",
  "Nu", "NumPy", "NXTG", "Oberon", "ObjDump", "Object Rexx", "Objective-C",
  "Objective-C++", "Objective-J", "OCaml", "Occam", "Omgrofl", "ooc", "Opa",
  "Opal", "OpenCL", "OpenEdge ABL", "OpenEdgeABL", "OpenSCAD", "OPL", "Org",
  "Other", "Ox", "Oxygene", "Oz", "Pan", "Papyrus", "Paradox", "Parrot",
  "Parrot Assembly", "Parrot Internal Representation", "Pascal", "PAWN", "Perl",
  "Perl6", "PHP", "PicoLisp", "PigLatin", "Pike", "PILOT", "PLI", "Pliant",
  "PLpgSQL", "PLSQL", "Pod", "PogoScript", "PostScript", "POVRay", "PowerBasic",
  "PowerScript", "PowerShell", "Processing", "Prolog", "Propeller Spin",
  "Protocol Buffer", "Public Key", "Puppet", "Pure Data", "PureBasic",
  "PureData", "PureScript", "Python", "Python traceback", "Q", "QMake", "QML",
  "R", "Racket", "Ragel in Ruby Host", "RAML", "Ratfor", "Raw token data",
  "RDoc", "REALbasic", "REALbasicDuplicate", "REBOL", "Red", "Redcode",
  "RenderScript", "reStructuredText", "Revolution", "REXX", "RHTML",
  "RMarkdown", "RobotFramework", "Rouge", "RPGOS400", "Ruby", "Rust", "S",
  "Sage", "SaltStack", "SAS", "Sass", "Sather", "Scala", "Scaml", "Scheme",
  "Scilab", "Scratch", "SCSS", "sed", "Seed7", "Self", "Shell", "ShellSession",
  "Shen", "SIGNAL", "Simula", "Simulink", "Slash", "Slate", "Slim", "Smali",
  "Smalltalk", "Smarty", "SMT", "SourcePawn", "SPARK", "SPARQL", "SPLUS",
  "SPSS", "SQF", "SQL", "SQLPL", "SQR", "Squeak", "Squirrel", "Standard ML",
  "Stata", "STON", "Stylus", "Suneido", "SuperCollider", "SVG", "Swift",
  "SystemVerilog", "TACL", "Tcl", "Tcsh", "Tea", "TeX", "Text", "Textile",
  "thinBasic", "Thrift", "TOM", "TOML", "Transact-SQL", "Turing", "Turtle",
  "Twig", "TXL", "TypeScript", "Unified Parallel C", "Unity3D Asset",
  "UnrealScript", "Vala", "VBScript", "VCL", "Verilog", "VHDL", "VimL",
  "Visual Basic", "Visual Basic.NET", "Visual Fortran", "Visual FoxPro", "Volt",
  "Vue", "Web Ontology Language", "WebDNA", "WebIDL", "Whitespace", "wisp",
  "Wolfram Language", "X10", "xBase", "XBase++", "XC", "Xen", "XML", "Xojo",
  "XPages", "XPL", "XProc", "XQuery", "XS", "XSLT", "Xtend", "Yacc", "YAML",
  "Yorick", "Zephir", "Zimpl", "Zshell",
];

/// The canonical spelling of `name`, matched case-insensitively. Names not in
/// the table pass through unchanged.
pub fn canonical_language(name: &str) -> String {
  let name = name.trim();
  KNOWN
    .binary_search_by(|known| cmp_ignore_case(known, name))
    .map(|i| KNOWN[i].to_owned())
    .unwrap_or_else(|_| name.to_owned())
}

fn cmp_ignore_case(a: &str, b: &str) -> std::cmp::Ordering {
  a.chars()
    .flat_map(char::to_lowercase)
    .cmp(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_is_sorted_for_binary_search() {
    assert!(KNOWN.windows(2).all(|w| cmp_ignore_case(w[0], w[1]).is_lt()));
  }

  #[test]
  fn lowercase_names_are_recased() {
    assert_eq!(canonical_language("viml"), "VimL");
    assert_eq!(canonical_language("c++"), "C++");
    assert_eq!(canonical_language("JAVASCRIPT"), "JavaScript");
  }

  #[test]
  fn unknown_names_pass_through() {
    assert_eq!(canonical_language("Zorblang"), "Zorblang");
  }
}
