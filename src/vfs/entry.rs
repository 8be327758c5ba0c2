use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum EntryType {
    File,
    Directory,
}

/// One line of a directory listing or tree dump.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    name: String,
    entry_type: EntryType,
    refs: usize,
}

impl Entry {
    pub fn dir<S: Into<String>>(name: S) -> Entry {
        Entry {
            name: name.into(),
            entry_type: EntryType::Directory,
            refs: 0,
        }
    }

    pub fn file<S: Into<String>>(name: S, refs: usize) -> Entry {
        Entry {
            name: name.into(),
            entry_type: EntryType::File,
            refs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Reference count of the file's record; `None` for directories.
    pub fn refs(&self) -> Option<usize> {
        self.is_file().then_some(self.refs)
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry_type {
            EntryType::Directory if self.name.ends_with('/') => write!(f, "{}", self.name),
            EntryType::Directory => write!(f, "{}/", self.name),
            EntryType::File => write!(f, "{} (refs: {})", self.name, self.refs),
        }
    }
}
