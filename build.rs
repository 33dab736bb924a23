fn main() {
    let mut build = cc::Build::new();

    build
        .include("native/include")
        .file("native/nativehost.c")
        .flag_if_supported("-std=c11")
        .flag_if_supported("-O2");

    // Emits the link-search and static link-lib directives for us
    build.compile("hostinterop_native");

    println!("cargo:rerun-if-changed=native/include/nativehost.h");
    println!("cargo:rerun-if-changed=native/nativehost.c");
}
