fn main() {
    kvload::cmdline();
}
