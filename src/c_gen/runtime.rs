//! Fixed C text emitted around the embedded modules.
//!
//! The generated program relies on a handful of libgauche entry points:
//! `Scm_Init`, `Scm_LoadFromPort`, `Scm_Apply` and friends. It also defines
//! its own `Scm_FindFile`, which the linker prefers over the library's copy,
//! so that requests for bundled native extensions succeed even when the
//! original file is absent at run time.

/// Includes and the failure exit status.
pub(super) const PRELUDE: &str = r#"#include <gauche.h>
#include <string.h>
#include <sys/stat.h>

#ifndef EX_SOFTWARE
#define EX_SOFTWARE 70
#endif
"#;

/// File lookup override consulted by `load`, `require` and `dynamic-load`.
///
/// Expects `frozen_extensions`, a NULL-terminated array of absolute paths,
/// to be defined before it.
pub(super) const FIND_FILE: &str = r#"
static int frozen_direct_p(const char *request)
{
    return request[0] == '/' || request[0] == '~'
        || strncmp(request, "./", 2) == 0
        || strncmp(request, "../", 3) == 0;
}

static int frozen_entry_matches(const char *entry, const char *request,
                                const char *suffix, int relative)
{
    size_t entry_len = strlen(entry);
    size_t request_len = strlen(request);
    size_t want_len = request_len + strlen(suffix);
    const char *tail;

    if (entry_len < want_len) return 0;
    tail = entry + (entry_len - want_len);
    if (strncmp(tail, request, request_len) != 0) return 0;
    if (strcmp(tail + request_len, suffix) != 0) return 0;
    if (entry_len == want_len) return 1;
    return relative && tail[-1] == '/';
}

static const char *frozen_lookup_extension(const char *request, ScmObj suffixes)
{
    int relative = !frozen_direct_p(request);
    const char *const *entry;
    ScmObj sp;

    for (entry = frozen_extensions; *entry != NULL; entry++) {
        if (frozen_entry_matches(*entry, request, "", relative)) return *entry;
        SCM_FOR_EACH(sp, suffixes) {
            ScmObj suffix = SCM_CAR(sp);
            if (!SCM_STRINGP(suffix)) continue;
            if (frozen_entry_matches(*entry, request,
                                     Scm_GetStringConst(SCM_STRING(suffix)),
                                     relative)) {
                return *entry;
            }
        }
    }
    return NULL;
}

static int frozen_regular_file_p(ScmObj path)
{
    struct stat st;
    return stat(Scm_GetStringConst(SCM_STRING(path)), &st) == 0
        && S_ISREG(st.st_mode);
}

static ScmObj frozen_try_suffixes(ScmObj base, ScmObj suffixes)
{
    ScmObj sp;

    if (frozen_regular_file_p(base)) return base;
    SCM_FOR_EACH(sp, suffixes) {
        ScmObj suffix = SCM_CAR(sp);
        ScmObj candidate;
        if (!SCM_STRINGP(suffix)) continue;
        candidate = Scm_StringAppend2(SCM_STRING(base), SCM_STRING(suffix));
        if (frozen_regular_file_p(candidate)) return candidate;
    }
    return SCM_FALSE;
}

ScmObj Scm_FindFile(ScmString *filename, ScmObj *paths, ScmObj suffixes, int flags)
{
    const char *request = Scm_GetStringConst(filename);
    const char *bundled = frozen_lookup_extension(request, suffixes);
    ScmObj searched = (paths != NULL) ? *paths : SCM_NIL;
    ScmObj found;
    ScmObj lp;

    if (bundled != NULL) {
        return Scm_MakeString(bundled, -1, -1, SCM_STRING_COPYING);
    }

    if (frozen_direct_p(request)) {
        ScmObj base = SCM_OBJ(filename);
        if (request[0] == '~') {
            base = Scm_NormalizePathname(filename, SCM_PATH_EXPAND);
        }
        found = frozen_try_suffixes(base, suffixes);
        if (!SCM_FALSEP(found)) return found;
    } else {
        SCM_FOR_EACH(lp, searched) {
            ScmObj dir = SCM_CAR(lp);
            ScmObj base;
            if (!SCM_STRINGP(dir)) continue;
            base = Scm_StringAppendC(SCM_STRING(dir), "/", 1, 1);
            base = Scm_StringAppend2(SCM_STRING(base), filename);
            found = frozen_try_suffixes(base, suffixes);
            if (!SCM_FALSEP(found)) {
                if (paths != NULL) *paths = SCM_CDR(lp);
                return found;
            }
        }
    }

    if (flags & SCM_LOAD_QUIET_NOFILE) return SCM_FALSE;
    Scm_Error("cannot find \"%s\" in %S", request, searched);
    return SCM_FALSE;
}
"#;

/// Evaluate one embedded module in the current (user) module.
pub(super) const LOAD_ONE: &str = r#"
static void frozen_report(const char *what, ScmObj condition)
{
    Scm_Printf(SCM_CURERR, "*** ERROR: %s: %A\n", what,
               Scm_ConditionMessage(condition));
    Scm_Flush(SCM_CURERR);
}

static int frozen_load(const char *name, const char *source, ScmSmallInt size)
{
    ScmLoadPacket packet;
    ScmObj text = Scm_MakeString(source, size, -1, SCM_STRING_IMMUTABLE);
    ScmObj port = Scm_MakeInputStringPort(SCM_STRING(text), TRUE);

    if (Scm_LoadFromPort(SCM_PORT(port), 0, &packet) < 0) {
        frozen_report(name, packet.exception);
        return -1;
    }
    return 0;
}
"#;

/// Process entry point. Expects `frozen_load_modules` to be defined before it.
pub(super) const MAIN: &str = r#"
int main(int argc, char **argv)
{
    ScmModule *user;
    ScmObj args;
    ScmObj main_proc;
    ScmEvalPacket packet;

    GC_INIT();
    Scm_Init(GAUCHE_SIGNATURE);
    user = Scm_UserModule();

    args = Scm_CStringArrayToList((const char **)argv, argc, SCM_STRING_IMMUTABLE);
    Scm_Define(user, SCM_SYMBOL(SCM_INTERN("*argv*")), args);
    Scm_Define(user, SCM_SYMBOL(SCM_INTERN("*program-name*")),
               SCM_PAIRP(args) ? SCM_CAR(args) : SCM_FALSE);

    if (frozen_load_modules() < 0) {
        Scm_Exit(EX_SOFTWARE);
    }

    main_proc = Scm_GlobalVariableRef(user, SCM_SYMBOL(SCM_INTERN("main")), 0);
    if (!SCM_PROCEDUREP(main_proc)) {
        Scm_Exit(0);
    }
    if (Scm_Apply(main_proc, SCM_LIST1(args), &packet) < 0) {
        frozen_report("main", packet.exception);
        Scm_Exit(EX_SOFTWARE);
    }
    if (packet.numResults > 0 && SCM_INTP(packet.results[0])) {
        Scm_Exit((int)SCM_INT_VALUE(packet.results[0]));
    }
    Scm_Exit(EX_SOFTWARE);
    return EX_SOFTWARE;
}
"#;
